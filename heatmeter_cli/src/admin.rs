//! One-shot maintenance commands: health check and counter inspection.

use eyre::Result;
use heatmeter_config::Config;
use heatmeter_core::{CounterStore, PipelineError};
use heatmeter_core::processor::names;
use heatmeter_traits::Connect;

use crate::error_fmt::CliError;

pub fn self_check<K: Connect>(cfg: &Config, mut connector: K, json: bool) -> Result<()> {
    let store = CounterStore::open(&cfg.counters.file)?;
    let _link = connector.connect().map_err(|e| PipelineError::link(&*e))?;
    tracing::info!(device = %cfg.serial.device, "link opened");
    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "device": cfg.serial.device,
                "counters": store.values().len(),
            })
        );
    } else {
        println!(
            "OK: config valid, {} counters loaded, link {} opened",
            store.values().len(),
            cfg.serial.device
        );
    }
    Ok(())
}

pub fn print_counters(cfg: &Config) -> Result<()> {
    let store = CounterStore::open(&cfg.counters.file)?;
    println!("{}", serde_json::to_string_pretty(store.values())?);
    Ok(())
}

pub fn set_counter(cfg: &Config, name: &str, value: f64) -> Result<()> {
    if !names::ALL.contains(&name) {
        return Err(CliError::UnknownCounter(name.to_owned()).into());
    }
    if !value.is_finite() {
        return Err(CliError::NonFiniteValue(value).into());
    }
    let mut store = CounterStore::open(&cfg.counters.file)?;
    let previous = store.get(name);
    store.reset(name, value)?;
    store.save()?;
    tracing::info!(name, previous, value, "counter overwritten");
    println!("{name}: {previous} -> {value}");
    Ok(())
}
