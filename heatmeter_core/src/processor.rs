//! Raw sample → snapshot transform.
//!
//! Two jobs run on every accepted sample:
//! - pulse reconciliation: device tick counters are folded into persistent
//!   totals, with a counter going backwards taken as a device reboot;
//! - energy integration: volume deltas between consecutive samples are
//!   turned into heat using the matching temperature pair.
//!
//! Pulses produced while the device was rebooting or disconnected are never
//! counted: after a reset the new raw value only becomes the next baseline.

use std::sync::{Arc, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use heatmeter_traits::clock::Clock;

use crate::config::{Calibration, Installation};
use crate::counters::{CounterStore, SharedCounters};
use crate::energy::{
    LITERS_PER_M3, deg_to_joules, joules_to_kwh, seconds_to_hours, stored_temp_c, water_energy_j,
};
use crate::sample::{RawSample, Snapshot};

/// Persistent counter keys.
pub mod names {
    pub const USED_WATER_TICKS: &str = "used_water_ticks";
    pub const SOLAR_LOOP_TICKS: &str = "solar_loop_ticks";
    pub const AUX_HEATER_TICKS: &str = "aux_heater_ticks";
    pub const SOLAR_ENERGY_J: &str = "solar_energy_j";
    pub const DISSIPATED_ENERGY_J: &str = "dissipated_energy_j";
    pub const DISSIPATION_S: &str = "dissipation_s";
    pub const CONSUMED_ENERGY_J: &str = "consumed_energy_j";

    pub const ALL: [&str; 7] = [
        USED_WATER_TICKS,
        SOLAR_LOOP_TICKS,
        AUX_HEATER_TICKS,
        SOLAR_ENERGY_J,
        DISSIPATED_ENERGY_J,
        DISSIPATION_S,
        CONSUMED_ENERGY_J,
    ];
}

/// Same order as `RawSample::pulses()`.
const PULSE_COUNTERS: [&str; 3] = [
    names::USED_WATER_TICKS,
    names::SOLAR_LOOP_TICKS,
    names::AUX_HEATER_TICKS,
];

#[derive(Debug, Clone, Copy)]
struct Volumes {
    solar_loop_m3: f64,
    used_water_m3: f64,
}

#[derive(Debug, Default)]
struct ProcessorState {
    last_ticks: Option<[u64; 3]>,
    last_volumes: Option<Volumes>,
    last_at: Option<Instant>,
}

pub struct ReadingProcessor<C: Clock> {
    store: SharedCounters,
    calibration: Calibration,
    installation: Installation,
    clock: C,
    state: ProcessorState,
}

impl<C: Clock> ReadingProcessor<C> {
    pub fn new(
        store: SharedCounters,
        calibration: Calibration,
        installation: Installation,
        clock: C,
    ) -> Self {
        Self {
            store,
            calibration,
            installation,
            clock,
            state: ProcessorState::default(),
        }
    }

    pub fn store(&self) -> SharedCounters {
        Arc::clone(&self.store)
    }

    /// Turn one accepted sample into a snapshot. Must be called sequentially.
    pub fn process(&mut self, raw: &RawSample) -> Snapshot {
        let now = self.clock.now();
        let timestamp: DateTime<Utc> = self.clock.wall().into();

        let shared = Arc::clone(&self.store);
        let mut store = shared.lock().unwrap_or_else(PoisonError::into_inner);

        let totals = self.reconcile_pulses(&mut store, raw);
        self.integrate_energy(&mut store, raw, now);
        self.state.last_at = Some(now);

        self.snapshot(&store, raw, totals, timestamp)
    }

    fn reconcile_pulses(&mut self, store: &mut CounterStore, raw: &RawSample) -> [f64; 3] {
        let ticks = raw.pulses();
        let deltas: [u64; 3] = match self.state.last_ticks {
            None => {
                tracing::debug!(?ticks, "pulse baseline established");
                [0; 3]
            }
            Some(prev) if ticks.iter().zip(prev.iter()).any(|(new, old)| new < old) => {
                tracing::warn!(?prev, ?ticks, "pulse counters went backwards, assuming device reset");
                [0; 3]
            }
            Some(prev) => [
                ticks[0] - prev[0],
                ticks[1] - prev[1],
                ticks[2] - prev[2],
            ],
        };
        self.state.last_ticks = Some(ticks);

        let mut totals = [0.0; 3];
        for ((total, name), delta) in totals.iter_mut().zip(PULSE_COUNTERS).zip(deltas) {
            *total = store.update(name, delta as f64);
        }
        totals
    }

    /// Adds heat moved by the water that flowed since the previous sample.
    ///
    /// Solar loop heat goes to `solar_energy_j`, or to `dissipated_energy_j`
    /// when the loop cooled the tank. Used-water heat is added only when the
    /// hot probe reads at least the cold one; otherwise the increment is zero.
    /// Volume decreases add nothing.
    fn integrate_energy(&mut self, store: &mut CounterStore, raw: &RawSample, now: Instant) {
        let current = Volumes {
            solar_loop_m3: raw.solar_loop_ticks as f64
                / self.calibration.solar_loop_ticks_per_liter
                / LITERS_PER_M3,
            used_water_m3: raw.used_water_ticks as f64
                / self.calibration.used_water_ticks_per_liter
                / LITERS_PER_M3,
        };

        if let Some(prev) = self.state.last_volumes {
            let d_solar = current.solar_loop_m3 - prev.solar_loop_m3;
            if d_solar > 0.0 {
                let joules = water_energy_j(d_solar, raw.exchanger_in_c, raw.exchanger_out_c);
                if joules < 0.0 {
                    // The loop pulled heat out of the tank (panels cooling it down).
                    let elapsed = self
                        .state
                        .last_at
                        .map(|at| now.saturating_duration_since(at).as_secs_f64())
                        .unwrap_or(0.0);
                    store.update(names::DISSIPATED_ENERGY_J, -joules);
                    store.update(names::DISSIPATION_S, elapsed);
                } else {
                    store.update(names::SOLAR_ENERGY_J, joules);
                }
            }

            let d_used = current.used_water_m3 - prev.used_water_m3;
            if d_used > 0.0 {
                let joules = water_energy_j(d_used, raw.hot_water_c, raw.cold_water_c);
                store.update(names::CONSUMED_ENERGY_J, joules.max(0.0));
            }
        }

        self.state.last_volumes = Some(current);
    }

    fn snapshot(
        &self,
        store: &CounterStore,
        raw: &RawSample,
        totals: [f64; 3],
        timestamp: DateTime<Utc>,
    ) -> Snapshot {
        let [used_water_ticks, solar_loop_ticks, aux_heater_ticks] = totals;
        let aux_heater_kwh = aux_heater_ticks / self.calibration.aux_heater_ticks_per_kwh;
        let consumed_energy_kwh = joules_to_kwh(store.get(names::CONSUMED_ENERGY_J));
        let useful_solar_kwh = consumed_energy_kwh - aux_heater_kwh;
        let stored_temp = stored_temp_c(raw.tank_bottom_c, raw.tank_top_c);

        Snapshot {
            timestamp,
            used_water_ticks,
            solar_loop_ticks,
            aux_heater_ticks,
            tank_top_c: raw.tank_top_c,
            tank_bottom_c: raw.tank_bottom_c,
            hot_water_c: raw.hot_water_c,
            cold_water_c: raw.cold_water_c,
            panel_out_c: raw.panel_out_c,
            exchanger_in_c: raw.exchanger_in_c,
            exchanger_out_c: raw.exchanger_out_c,
            used_water_l: used_water_ticks / self.calibration.used_water_ticks_per_liter,
            solar_loop_l: solar_loop_ticks / self.calibration.solar_loop_ticks_per_liter,
            aux_heater_kwh,
            solar_energy_kwh: joules_to_kwh(store.get(names::SOLAR_ENERGY_J)),
            dissipated_energy_kwh: joules_to_kwh(store.get(names::DISSIPATED_ENERGY_J)),
            dissipation_h: seconds_to_hours(store.get(names::DISSIPATION_S)),
            consumed_energy_kwh,
            useful_solar_kwh,
            specific_productivity_kwh_m2: useful_solar_kwh / self.installation.collector_area_m2,
            stored_temp_c: stored_temp,
            stored_energy_kwh: joules_to_kwh(deg_to_joules(
                stored_temp - raw.cold_water_c,
                self.installation.stored_water_volume_m3,
            )),
        }
    }
}
