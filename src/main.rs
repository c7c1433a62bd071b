use clap::Parser;
use tickwatch::cli::{Cli, Commands};
use tickwatch::config::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    tickwatch::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Demo(args) => {
            tracing::info!("Starting surveillance demo");
            args.execute(&config)?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Detector: flush every {} trades, timezone {}",
                config.detector.flush_interval, config.detector.timezone
            );
            println!("  Store: {}", config.store.path.display());
            println!("  Log level: {}", config.telemetry.log_level);
        }
    }

    Ok(())
}
