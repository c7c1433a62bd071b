//! Configuration types for tickwatch

use std::path::PathBuf;

use chrono_tz::Tz;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Detection engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Streamed trades between characteristic flushes
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,

    /// Reporting timezone for characteristic timestamps (IANA identifier)
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
}

fn default_flush_interval() -> usize {
    50
}
fn default_timezone() -> Tz {
    Tz::Europe__London
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            flush_interval: 50,
            timezone: Tz::Europe__London,
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tickwatch.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [detector]
            flush_interval = 25
            timezone = "America/New_York"

            [store]
            path = "/var/lib/tickwatch/surveillance.db"

            [telemetry]
            log_level = "debug"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.detector.flush_interval, 25);
        assert_eq!(config.detector.timezone, Tz::America__New_York);
        assert_eq!(
            config.store.path,
            PathBuf::from("/var/lib/tickwatch/surveillance.db")
        );
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.detector.flush_interval, 50);
        assert_eq!(config.detector.timezone, Tz::Europe__London);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let toml = r#"
            [detector]
            timezone = "Not/AZone"
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }
}
