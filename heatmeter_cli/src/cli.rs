//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "heatmeter", version, about = "Solar hot-water heat meter")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/heatmeter.toml")]
    pub config: PathBuf,

    /// Log and print as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); defaults to [logging] level, then info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest readings and print every fresh snapshot until Ctrl-C
    Run {
        /// How often the latest snapshot is polled, in ms
        #[arg(long, value_name = "MS", default_value_t = 1000)]
        poll_ms: u64,
        /// Stop after this many snapshots were printed
        #[arg(long, value_name = "N")]
        max_snapshots: Option<u64>,
    },
    /// Validate config, load the counter file and open the link once
    SelfCheck,
    /// Print the persisted counters as JSON
    Counters,
    /// Overwrite one persisted counter (administrative correction)
    SetCounter {
        /// Counter name, e.g. solar_energy_j
        #[arg(long)]
        name: String,
        /// New absolute value
        #[arg(long, allow_negative_numbers = true)]
        value: f64,
    },
}
