//! Human-readable error descriptions and structured JSON error formatting.

use heatmeter_core::PipelineError;

/// Failures that only exist at the command-line boundary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read config {path}: {reason}")]
    ConfigRead { path: String, reason: String },
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("unknown counter {0:?}")]
    UnknownCounter(String),
    #[error("counter value must be a finite number, got {0}")]
    NonFiniteValue(f64),
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::ConfigRead { path, reason } => format!(
                "What happened: The config file {path} could not be read ({reason}).\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Point --config at an existing TOML file (see etc/heatmeter.toml)."
            ),
            CliError::ConfigInvalid(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing [serial] or [counters] section, or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            CliError::UnknownCounter(name) => format!(
                "What happened: There is no counter named {name:?}.\nLikely causes: Typo in --name.\nHow to fix: Use one of: {}.",
                heatmeter_core::processor::names::ALL.join(", ")
            ),
            CliError::NonFiniteValue(value) => format!(
                "What happened: {value} cannot be stored as a counter value.\nLikely causes: --value was given as NaN or infinity.\nHow to fix: Pass a finite number, e.g. --value 0."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PipelineError>() {
        return match pe {
            PipelineError::StoreUnconfigured => "What happened: Counters could not be saved because no counter file is configured.\nLikely causes: The store was created in memory only.\nHow to fix: Set [counters] file in the config.".to_string(),
            PipelineError::Store { path, reason } => format!(
                "What happened: The counter file {path} could not be used ({reason}).\nLikely causes: Corrupted JSON, a full disk or missing write permission on its directory.\nHow to fix: Check the file and its directory; restore it from a backup or fix it with `heatmeter set-counter`."
            ),
            PipelineError::NonFiniteCounter { name, value } => format!(
                "What happened: Counter {name} was about to be set to {value}.\nLikely causes: A faulty reading or a bad --value.\nHow to fix: Pass a finite number to `heatmeter set-counter`."
            ),
            PipelineError::Link(msg) => format!(
                "What happened: The meter link failed ({msg}).\nLikely causes: Microcontroller unplugged, wrong serial.device, or the port is held by another process.\nHow to fix: Check the USB cable and serial.device, then rerun `heatmeter self-check`."
            ),
            PipelineError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes; 2 is left to clap for usage errors.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::ConfigRead { .. } | CliError::ConfigInvalid(_) => 5,
            CliError::UnknownCounter(_) | CliError::NonFiniteValue(_) => 2,
        };
    }
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::StoreUnconfigured) => 3,
        Some(PipelineError::Store { .. }) => 4,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::ConfigRead { .. } => "ConfigRead",
            CliError::ConfigInvalid(_) => "ConfigInvalid",
            CliError::UnknownCounter(_) => "UnknownCounter",
            CliError::NonFiniteValue(_) => "NonFiniteValue",
        };
    }
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::StoreUnconfigured) => "StoreUnconfigured",
        Some(PipelineError::Store { .. }) => "Store",
        Some(PipelineError::Link(_)) => "Link",
        Some(PipelineError::NonFiniteCounter { .. }) => "NonFiniteCounter",
        Some(PipelineError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let obj = match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::Store { path, reason }) => json!({
            "reason": reason_name(err),
            "details": { "path": path, "cause": reason },
            "message": humanize(err),
        }),
        _ => json!({ "reason": reason_name(err), "message": humanize(err) }),
    };
    obj.to_string()
}
