mod admin;
mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::{Result, eyre};
use heatmeter_config::{Config, Logging};
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{CliError, exit_code_for_error, format_error_json, humanize};
use crate::run::{RunParams, run_pipeline};

fn main() {
    let _ = color_eyre::install();
    // clap exits with code 2 on usage errors
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        tracing::error!(error = %e, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    let level = cli
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    // Dropping the guard flushes the file writer
    let _log_guard = init_tracing(cli.json, level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            poll_ms,
            max_snapshots,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = Arc::clone(&shutdown);
                ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))?;
            }
            let params = RunParams {
                poll: Duration::from_millis(poll_ms.max(1)),
                max_snapshots,
                json: cli.json,
            };
            run_pipeline(&cfg, connector(&cfg), &params, &shutdown)
        }
        Commands::SelfCheck => admin::self_check(&cfg, connector(&cfg), cli.json),
        Commands::Counters => admin::print_counters(&cfg),
        Commands::SetCounter { name, value } => admin::set_counter(&cfg, &name, value),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::ConfigRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let cfg =
        heatmeter_config::load_toml(&text).map_err(|e| CliError::ConfigInvalid(e.to_string()))?;
    cfg.validate()
        .map_err(|e| CliError::ConfigInvalid(e.to_string()))?;
    Ok(cfg)
}

#[cfg(feature = "hardware")]
fn connector(cfg: &Config) -> heatmeter_hardware::SerialConnector {
    heatmeter_hardware::SerialConnector::new(cfg.serial.device.clone(), cfg.serial.baud_rate)
}

#[cfg(not(feature = "hardware"))]
fn connector(cfg: &Config) -> heatmeter_hardware::SimulatedConnector {
    tracing::info!(
        line_period_ms = cfg.simulation.line_period_ms,
        "built without `hardware`: using the simulated meter"
    );
    heatmeter_hardware::SimulatedConnector::new(Duration::from_millis(
        cfg.simulation.line_period_ms,
    ))
}

/// Console layer on stderr (pretty or JSON) plus an optional JSON file layer.
fn init_tracing(json: bool, level: &str, logging: &Logging) -> Result<Option<WorkerGuard>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let mut guard = None;
    let file = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre!("logging.file {file:?} has no file name"))?;
            let rotation = match logging.rotation.as_deref() {
                Some("hourly") => Rotation::HOURLY,
                Some("daily") => Rotation::DAILY,
                _ => Rotation::NEVER,
            };
            let appender = RollingFileAppender::builder()
                .rotation(rotation)
                .filename_prefix(name.to_string_lossy().into_owned())
                .build(dir)?;
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;
    Ok(guard)
}
