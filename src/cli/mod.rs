//! CLI interface for tickwatch
//!
//! Provides subcommands for:
//! - `demo`: run the full pipeline over a synthetic trade stream
//! - `config`: show the resolved configuration

mod demo;

pub use demo::DemoArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tickwatch")]
#[command(about = "Statistical trade surveillance over per-symbol streams")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline over a synthetic trade stream
    Demo(DemoArgs),
    /// Show the resolved configuration
    Config,
}
