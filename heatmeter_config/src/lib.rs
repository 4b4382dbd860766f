#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the heat meter ingestion daemon.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Only `[serial]` and `[counters]` are mandatory; every other section
//!   falls back to defaults matching the reference installation.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Serial {
    /// Device node of the microcontroller, e.g. "/dev/ttyACM0"
    pub device: String,
    pub baud_rate: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Reset the device when no valid sample arrived for this long (ms).
    /// Also accepts alias "fresh_ms".
    #[serde(alias = "fresh_ms")]
    pub fresh_data_ms: u64,
    /// Fixed wait before reopening the link after a failure (ms)
    pub reconnect_ms: u64,
    /// Time the reset line is held low (ms)
    pub reset_pause_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            fresh_data_ms: 10_000,
            reconnect_ms: 15_000,
            reset_pause_ms: 1_000,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Counters {
    /// JSON file holding the persistent counters
    pub file: String,
    /// Opportunistic flush interval (seconds)
    #[serde(default = "default_save_period_s")]
    pub save_period_s: u64,
}

const fn default_save_period_s() -> u64 {
    600
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub used_water_ticks_per_liter: f64,
    pub solar_loop_ticks_per_liter: f64,
    /// Electricity meter constant of the auxiliary heater (impulses per kWh)
    pub aux_heater_ticks_per_kwh: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            used_water_ticks_per_liter: 1.0,
            solar_loop_ticks_per_liter: 1.0,
            aux_heater_ticks_per_kwh: 1000.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Installation {
    pub collector_area_m2: f64,
    pub stored_water_volume_m3: f64,
}

impl Default for Installation {
    fn default() -> Self {
        Self {
            collector_area_m2: 2.0,
            stored_water_volume_m3: 0.3,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Simulation {
    /// Interval between lines emitted by the simulated device (ms)
    pub line_period_ms: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            line_period_ms: 1_000,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub serial: Serial,
    #[serde(default)]
    pub timeouts: Timeouts,
    pub counters: Counters,
    #[serde(default)]
    pub calibration: Calibration,
    #[serde(default)]
    pub installation: Installation,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub simulation: Simulation,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn positive_finite(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.device.trim().is_empty() {
            eyre::bail!("serial.device must not be empty");
        }
        if self.serial.baud_rate == 0 {
            eyre::bail!("serial.baud_rate must be > 0");
        }

        // Timeouts
        if self.timeouts.fresh_data_ms == 0 {
            eyre::bail!("timeouts.fresh_data_ms must be >= 1");
        }
        if self.timeouts.reconnect_ms == 0 {
            eyre::bail!("timeouts.reconnect_ms must be >= 1");
        }
        if self.timeouts.reset_pause_ms >= self.timeouts.fresh_data_ms {
            eyre::bail!("timeouts.reset_pause_ms must be < timeouts.fresh_data_ms");
        }

        // Counters
        if self.counters.file.trim().is_empty() {
            eyre::bail!("counters.file must not be empty");
        }
        if self.counters.save_period_s == 0 {
            eyre::bail!("counters.save_period_s must be >= 1");
        }

        // Calibration
        if !positive_finite(self.calibration.used_water_ticks_per_liter) {
            eyre::bail!("calibration.used_water_ticks_per_liter must be > 0");
        }
        if !positive_finite(self.calibration.solar_loop_ticks_per_liter) {
            eyre::bail!("calibration.solar_loop_ticks_per_liter must be > 0");
        }
        if !positive_finite(self.calibration.aux_heater_ticks_per_kwh) {
            eyre::bail!("calibration.aux_heater_ticks_per_kwh must be > 0");
        }

        // Installation
        if !positive_finite(self.installation.collector_area_m2) {
            eyre::bail!("installation.collector_area_m2 must be > 0");
        }
        if !positive_finite(self.installation.stored_water_volume_m3) {
            eyre::bail!("installation.stored_water_volume_m3 must be > 0");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rotation:?}");
        }

        // Simulation
        if self.simulation.line_period_ms == 0 {
            eyre::bail!("simulation.line_period_ms must be >= 1");
        }

        Ok(())
    }
}
