//! Fixed-shape records flowing through the pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of `;`-separated fields in one data line.
pub const FIELD_COUNT: usize = 10;

/// One decoded data line, in firmware order.
///
/// Pulse fields are the device's own tick counters; they restart at zero
/// whenever the microcontroller reboots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub used_water_ticks: u64,
    pub solar_loop_ticks: u64,
    pub aux_heater_ticks: u64,
    /// Top of the storage tank (°C)
    pub tank_top_c: f64,
    /// Bottom of the storage tank (°C)
    pub tank_bottom_c: f64,
    /// Hot water leaving the tank (°C)
    pub hot_water_c: f64,
    /// Cold water entering the tank (°C)
    pub cold_water_c: f64,
    /// Solar panel outlet (°C)
    pub panel_out_c: f64,
    /// Solar loop entering the tank exchanger (°C)
    pub exchanger_in_c: f64,
    /// Solar loop leaving the tank exchanger (°C)
    pub exchanger_out_c: f64,
}

impl RawSample {
    pub fn pulses(&self) -> [u64; 3] {
        [
            self.used_water_ticks,
            self.solar_loop_ticks,
            self.aux_heater_ticks,
        ]
    }
}

/// Processed view of one sample, in human units.
///
/// Pulse fields carry the persistent cumulative totals, never the device's
/// raw tick count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,

    pub used_water_ticks: f64,
    pub solar_loop_ticks: f64,
    pub aux_heater_ticks: f64,

    pub tank_top_c: f64,
    pub tank_bottom_c: f64,
    pub hot_water_c: f64,
    pub cold_water_c: f64,
    pub panel_out_c: f64,
    pub exchanger_in_c: f64,
    pub exchanger_out_c: f64,

    pub used_water_l: f64,
    pub solar_loop_l: f64,
    pub aux_heater_kwh: f64,

    pub solar_energy_kwh: f64,
    pub dissipated_energy_kwh: f64,
    pub dissipation_h: f64,
    pub consumed_energy_kwh: f64,

    /// Consumed energy not covered by the auxiliary heater
    pub useful_solar_kwh: f64,
    /// `useful_solar_kwh` per square meter of collector
    pub specific_productivity_kwh_m2: f64,

    /// Lumped storage temperature (°C)
    pub stored_temp_c: f64,
    /// Heat held in the tank above cold-water temperature
    pub stored_energy_kwh: f64,
}
