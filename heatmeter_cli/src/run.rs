//! Long-running ingestion: start the pipeline, poll the latest snapshot, print it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::Result;
use heatmeter_config::Config;
use heatmeter_core::util::{as_millis_u64, sleep_unless_stopped};
use heatmeter_core::{CounterStore, Pipeline, PipelineSettings, Snapshot};
use heatmeter_traits::Connect;
use heatmeter_traits::clock::MonotonicClock;

pub struct RunParams {
    pub poll: Duration,
    pub max_snapshots: Option<u64>,
    pub json: bool,
}

pub fn run_pipeline<K>(
    cfg: &Config,
    connector: K,
    params: &RunParams,
    shutdown: &Arc<AtomicBool>,
) -> Result<()>
where
    K: Connect + Send + 'static,
{
    let settings = PipelineSettings::from(cfg);
    let store = CounterStore::open(&cfg.counters.file)?;
    let clock = MonotonicClock::new();
    let pipeline = Pipeline::start(connector, clock, settings, store)?;

    let mut printed = 0u64;
    while sleep_unless_stopped(&clock, params.poll, shutdown) {
        match pipeline.latest() {
            Some(snapshot) => {
                print_snapshot(&snapshot, params.json)?;
                printed += 1;
                if params.max_snapshots.is_some_and(|max| printed >= max) {
                    break;
                }
            }
            None => tracing::warn!(poll_ms = as_millis_u64(params.poll), "no fresh data"),
        }
        if pipeline.is_finished() {
            tracing::error!("ingestion thread exited unexpectedly");
            break;
        }
    }
    if shutdown.load(Ordering::Relaxed) {
        tracing::info!("interrupted, shutting down");
    }

    let stats = pipeline.stop()?;
    tracing::info!(
        printed,
        samples = stats.samples,
        parse_failures = stats.parse_failures,
        stalls = stats.stalls,
        link_losses = stats.link_losses,
        "run finished"
    );
    Ok(())
}

fn print_snapshot(s: &Snapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(s)?);
    } else {
        println!(
            "{}  tank {:.1}/{:.1} °C  used {:.0} l  solar {:.3} kWh  dissipated {:.3} kWh  consumed {:.3} kWh  aux {:.3} kWh  stored {:.2} kWh",
            s.timestamp.format("%Y-%m-%d %H:%M:%S"),
            s.tank_top_c,
            s.tank_bottom_c,
            s.used_water_l,
            s.solar_energy_kwh,
            s.dissipated_energy_kwh,
            s.consumed_energy_kwh,
            s.aux_heater_kwh,
            s.stored_energy_kwh,
        );
    }
    Ok(())
}
