//! End-to-end tests for the detection pipeline

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tickwatch::config::DetectorConfig;
use tickwatch::detect::{AnomalyDetector, AnomalySource, DetectError, ErrorCode};
use tickwatch::store::{MemoryStore, PriceRange};
use tickwatch::trade::Trade;

fn at(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, hour, min, sec).unwrap()
}

fn trade(symbol: &str, time: DateTime<Utc>, price: Decimal, size: u64) -> Trade {
    Trade {
        symbol: symbol.to_string(),
        time,
        price,
        size,
        bid: price - dec!(0.01),
        ask: price + dec!(0.01),
    }
}

fn detector() -> AnomalyDetector<MemoryStore> {
    AnomalyDetector::new(DetectorConfig::default(), MemoryStore::new())
}

/// Oscillating batch price: 100.0 / 100.1 alternating.
fn oscillating_price(i: usize) -> Decimal {
    if i % 2 == 1 {
        dec!(100.1)
    } else {
        dec!(100.0)
    }
}

/// Ingest a 100-trade oscillating baseline for `symbol` and run the batch
/// pass, establishing the streaming baseline. Deltas are +-0.1 with a
/// stdev just under 0.1; volumes alternate 100/110.
fn establish_baseline(detector: &mut AnomalyDetector<MemoryStore>, symbol: &str) {
    let start = at(9, 0, 0);
    for i in 0..100 {
        let t = trade(
            symbol,
            start + Duration::seconds(90 * i as i64),
            oscillating_price(i),
            100 + 10 * (i as u64 % 2),
        );
        detector.ingest(&t, i as i64);
    }
    detector.analyze_batch().unwrap();
}

#[test]
fn test_batch_flags_single_price_outlier() {
    let mut detector = detector();
    let start = at(9, 0, 0);

    // 99 oscillating trades and one fat-fingered print at the end
    for i in 0..99 {
        let t = trade(
            "ABC",
            start + Duration::seconds(90 * i as i64),
            oscillating_price(i),
            100 + 10 * (i as u64 % 2),
        );
        detector.ingest(&t, i as i64);
    }
    let outlier = trade("ABC", start + Duration::seconds(90 * 99), dec!(200), 110);
    detector.ingest(&outlier, 99);

    let anomalies = detector.analyze_batch().unwrap();

    let ffp: Vec<_> = anomalies
        .iter()
        .filter(|a| a.code == ErrorCode::Ffp)
        .collect();
    assert_eq!(ffp.len(), 1);
    assert_eq!(ffp[0].severity.tier(), 1);
    assert_eq!(ffp[0].trade_id(), Some(99));
    assert_eq!(ffp[0].symbol, "ABC");

    // Volumes stayed in band
    assert!(anomalies.iter().all(|a| a.code != ErrorCode::Ffv));
}

#[test]
fn test_batch_flags_crossed_book() {
    let mut detector = detector();
    let start = at(9, 0, 0);

    for i in 0..20 {
        let mut t = trade(
            "ABC",
            start + Duration::seconds(30 * i as i64),
            oscillating_price(i),
            100 + 10 * (i as u64 % 2),
        );
        if i == 7 {
            // Crossed book: bid above ask
            t.bid = t.price + dec!(0.05);
            t.ask = t.price - dec!(0.05);
        }
        detector.ingest(&t, i as i64);
    }

    let anomalies = detector.analyze_batch().unwrap();
    let nbas: Vec<_> = anomalies
        .iter()
        .filter(|a| a.code == ErrorCode::Nbas)
        .collect();
    assert_eq!(nbas.len(), 1);
    assert_eq!(nbas[0].severity.tier(), 1);
    assert_eq!(nbas[0].trade_id(), Some(7));
}

#[test]
fn test_hourly_buckets_across_boundary() {
    let mut detector = detector();
    detector.ingest(&trade("ABC", at(9, 58, 0), dec!(100), 10), 1);
    detector.ingest(&trade("ABC", at(9, 59, 0), dec!(101), 20), 2);
    detector.ingest(&trade("ABC", at(10, 1, 0), dec!(105), 30), 3);

    detector.analyze_batch().unwrap();

    let stats = detector.stats("ABC").unwrap();
    assert_eq!(stats.hourly_vol, vec![30, 30]);
    assert_eq!(stats.hourly_max_change.len(), 2);
    // Closed 09 range covers only the 09:xx prices
    assert_eq!(stats.hourly_max_change[0], dec!(1));
    assert_eq!(stats.hourly_max_change[1], dec!(0));
}

#[test]
fn test_batch_consumes_buffer() {
    let mut detector = detector();
    detector.ingest(&trade("ABC", at(9, 0, 0), dec!(100), 10), 1);
    assert_eq!(detector.buffered(), 1);

    detector.analyze_batch().unwrap();
    assert_eq!(detector.buffered(), 0);
    assert!(detector.analyze_batch().unwrap().is_empty());
}

#[test]
fn test_streaming_price_fat_finger_severities() {
    let mut detector = detector();
    establish_baseline(&mut detector, "ABC");
    let start = at(12, 0, 0);

    // Last baseline price is 100.1; a normal oscillation stays clean
    let clean = detector
        .analyze_trade(&trade("ABC", start, dec!(100.0), 100), 1000)
        .unwrap();
    assert!(clean.is_empty());

    // Delta of 0.55 sits between the 5 and 6 sigma bands: severity 3
    let moderate = detector
        .analyze_trade(
            &trade("ABC", start + Duration::seconds(2), dec!(100.55), 100),
            1001,
        )
        .unwrap();
    assert_eq!(moderate.len(), 1);
    assert_eq!(moderate[0].code, ErrorCode::Ffp);
    assert_eq!(moderate[0].severity.tier(), 3);
    assert_eq!(moderate[0].trade_id(), Some(1001));
}

#[test]
fn test_streaming_volume_fat_finger() {
    let mut detector = detector();
    establish_baseline(&mut detector, "ABC");

    let found = detector
        .analyze_trade(&trade("ABC", at(12, 0, 0), dec!(100.0), 60_000), 1000)
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].code, ErrorCode::Ffv);
    assert_eq!(found[0].severity.tier(), 1);
}

#[test]
fn test_streaming_unknown_symbol_fails_fast() {
    let mut detector = detector();
    let result = detector.analyze_trade(&trade("GHOST", at(9, 0, 0), dec!(10), 1), 1);
    assert!(matches!(result, Err(DetectError::UnknownSymbol(s)) if s == "GHOST"));

    // Ingested but never batch-analyzed: still no baseline
    detector.ingest(&trade("ABC", at(9, 0, 0), dec!(100), 10), 1);
    let result = detector.analyze_trade(&trade("ABC", at(9, 0, 30), dec!(100), 10), 2);
    assert!(matches!(result, Err(DetectError::UnknownSymbol(_))));
}

#[test]
fn test_flush_cadence_every_fifty_trades() {
    let mut detector = detector();
    establish_baseline(&mut detector, "ABC");
    let commits_after_batch = detector.store().commits();
    let start = at(12, 0, 0);

    let mut anomalies_seen = 0;
    for i in 0..49i64 {
        let price = if i == 5 { dec!(140) } else { dec!(100.1) };
        let found = detector
            .analyze_trade(
                &trade("ABC", start + Duration::seconds(2 * i), price, 100),
                1000 + i,
            )
            .unwrap();
        anomalies_seen += found.len();
    }
    // Trade 6's fat finger was returned immediately, before any flush
    assert!(anomalies_seen >= 1);
    assert_eq!(detector.store().commits(), commits_after_batch);

    detector
        .analyze_trade(&trade("ABC", start + Duration::seconds(200), dec!(100.1), 100), 2000)
        .unwrap();
    assert_eq!(detector.store().commits(), commits_after_batch + 1);
    assert!(detector.store().committed("ABC").is_some());
}

#[test]
fn test_store_failure_keeps_anomalies() {
    let config = DetectorConfig {
        flush_interval: 2,
        ..DetectorConfig::default()
    };
    let mut detector = AnomalyDetector::new(config, MemoryStore::new());
    establish_baseline(&mut detector, "ABC");
    detector.store_mut().fail_commits();
    let start = at(12, 0, 0);

    detector
        .analyze_trade(&trade("ABC", start, dec!(100.1), 100), 1000)
        .unwrap();
    // Second trade triggers the flush, which fails; its fat finger must
    // still reach the caller through the error.
    let result = detector.analyze_trade(&trade("ABC", start + Duration::seconds(2), dec!(140), 100), 1001);
    match result {
        Err(err @ DetectError::Store { .. }) => {
            let anomalies = err.into_anomalies();
            assert_eq!(anomalies.len(), 1);
            assert_eq!(anomalies[0].code, ErrorCode::Ffp);
        }
        other => panic!("expected store failure, got {other:?}"),
    }
}

#[test]
fn test_batch_failure_leaves_other_symbols_analyzable() {
    let mut detector = detector();
    detector.store_mut().fail_upserts_for("BBB");

    let prices = [dec!(100), dec!(100.1), dec!(100)];
    let mut id = 0;
    for symbol in ["BBB", "CCC"] {
        for (i, price) in prices.iter().enumerate() {
            detector.ingest(
                &trade(symbol, at(9, 10 * i as u32, 0), *price, 90 + 10 * i as u64),
                id,
            );
            id += 1;
        }
    }

    // BBB's upsert fails, but both symbols must still be fully analyzed
    let err = match detector.analyze_batch() {
        Err(err @ DetectError::Store { .. }) => err,
        other => panic!("expected store failure, got {other:?}"),
    };
    assert_eq!(detector.buffered(), 0);
    assert!(err.into_anomalies().iter().any(|a| a.symbol == "CCC"));

    // Both baselines are established; CCC streams cleanly
    assert_eq!(detector.stats("BBB").unwrap().trade_count, 3);
    let found = detector
        .analyze_trade(&trade("CCC", at(10, 0, 0), dec!(100.05), 100), 100)
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_hourly_spike_with_inherited_pump_severity() {
    let mut detector = detector();

    // Twelve hourly buckets, two trades each. Hour index 10 carries both a
    // volume spike and the only nonzero price range; with eleven flat
    // buckets its z-score lands between 3 and 4 sigma.
    let mut id = 0;
    for hour in 0..12u32 {
        for half in 0..2u32 {
            let (price, size) = if hour == 10 {
                (if half == 0 { dec!(100) } else { dec!(101) }, 5_000)
            } else {
                (dec!(100), 100)
            };
            detector.ingest(&trade("ABC", at(hour, 30 * half, 0), price, size), id);
            id += 1;
        }
    }

    let anomalies = detector.analyze_batch().unwrap();

    let vs: Vec<_> = anomalies
        .iter()
        .filter(|a| a.code == ErrorCode::Vs)
        .collect();
    assert_eq!(vs.len(), 1);
    assert_eq!(vs[0].severity.tier(), 3);
    assert!(matches!(
        vs[0].source,
        AnomalySource::HourWindow { from_hour: 11 }
    ));

    let pdbr: Vec<_> = anomalies
        .iter()
        .filter(|a| a.code == ErrorCode::Pdbr)
        .collect();
    assert_eq!(pdbr.len(), 1);
    assert_eq!(pdbr[0].severity, vs[0].severity);
    assert!(matches!(
        pdbr[0].source,
        AnomalySource::HourWindow { from_hour: 11 }
    ));

    // Nothing trade-level fired
    assert!(anomalies
        .iter()
        .all(|a| a.code != ErrorCode::Ffp && a.code != ErrorCode::Ffv));
}

#[test]
fn test_reordering_preserves_volume_moments() {
    let volumes: Vec<u64> = (0..30).map(|i| 100 + (i * 37) % 400).collect();
    let start = at(9, 0, 0);

    let run = |order: Vec<usize>| {
        let mut detector = detector();
        for (slot, idx) in order.iter().enumerate() {
            let t = trade(
                "ABC",
                start + Duration::seconds(30 * slot as i64),
                oscillating_price(*idx),
                volumes[*idx],
            );
            detector.ingest(&t, *idx as i64);
        }
        detector.analyze_batch().unwrap();
        let stats = detector.stats("ABC").unwrap();
        stats.volume
    };

    let forward = run((0..30).collect());
    let backward = run((0..30).rev().collect());

    assert!((forward.mean - backward.mean).abs() < 1e-9);
    assert!((forward.stdev - backward.stdev).abs() < 1e-9);
}

#[test]
fn test_end_of_day_spike_and_pump() {
    let mut detector = detector();
    // Falling three-trade day: day price change baseline is -1
    detector.ingest(&trade("ABC", at(9, 0, 0), dec!(101), 90), 1);
    detector.ingest(&trade("ABC", at(9, 30, 0), dec!(100.5), 100), 2);
    detector.ingest(&trade("ABC", at(10, 0, 0), dec!(100), 110), 3);
    detector.analyze_batch().unwrap();

    let prior = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
    detector.store_mut().set_day_volume("ABC", prior, 900);
    detector.store_mut().set_day_range(
        "ABC",
        prior,
        PriceRange {
            max: dec!(100.6),
            min: dec!(100.2),
        },
    );

    let report = detector.analyze_end_of_day(prior + Duration::days(1));
    assert!(report.is_clean());

    let vs: Vec<_> = report
        .anomalies
        .iter()
        .filter(|a| a.code == ErrorCode::Vs)
        .collect();
    assert_eq!(vs.len(), 1);
    assert_eq!(vs[0].severity.tier(), 1);
    assert!(matches!(vs[0].source, AnomalySource::Day { date } if date == prior));

    let pdbr: Vec<_> = report
        .anomalies
        .iter()
        .filter(|a| a.code == ErrorCode::Pdbr)
        .collect();
    assert_eq!(pdbr.len(), 1);
    assert_eq!(pdbr[0].severity.tier(), 1);

    // Day-level moments folded the observation in
    let stats = detector.stats("ABC").unwrap();
    assert_eq!(stats.day_count, 2);
    assert!((stats.daily_volume.mean - 600.0).abs() < 1e-9);
}

#[test]
fn test_end_of_day_failure_is_localized() {
    let mut detector = detector();
    for (i, symbol) in ["ABC", "XYZ"].iter().enumerate() {
        detector.ingest(
            &trade(symbol, at(9, 0, i as u32), dec!(100), 90),
            i as i64 * 2,
        );
        detector.ingest(
            &trade(symbol, at(9, 30, i as u32), dec!(100.5), 110),
            i as i64 * 2 + 1,
        );
    }
    detector.analyze_batch().unwrap();

    let prior = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
    detector.store_mut().set_day_volume("ABC", prior, 250);
    detector.store_mut().set_day_range(
        "ABC",
        prior,
        PriceRange {
            max: dec!(100.5),
            min: dec!(100),
        },
    );
    // XYZ has no day data: its reconciliation fails, ABC's proceeds

    let report = detector.analyze_end_of_day(prior + Duration::days(1));
    assert_eq!(report.failed_symbols.len(), 1);
    assert_eq!(report.failed_symbols[0].0, "XYZ");
    assert!(report.commit_error.is_none());

    assert_eq!(detector.stats("ABC").unwrap().day_count, 2);
    assert_eq!(detector.stats("XYZ").unwrap().day_count, 1);
}
