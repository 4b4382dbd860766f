//! Runtime configuration types for the ingestion pipeline.
//!
//! These are separate from the TOML-deserialized config in `heatmeter_config`;
//! see `conversions` for the mapping.

use std::time::Duration;

/// Link supervision timings.
#[derive(Debug, Clone)]
pub struct SupervisorCfg {
    /// Stall deadline: no successfully parsed sample for this long resets the device.
    pub fresh_data_timeout: Duration,
    /// Fixed wait before reopening the link after an open failure or link loss.
    pub reconnect_backoff: Duration,
    /// How long the reset signal is held low.
    pub reset_pause: Duration,
}

impl Default for SupervisorCfg {
    fn default() -> Self {
        Self {
            fresh_data_timeout: Duration::from_secs(10),
            reconnect_backoff: Duration::from_secs(15),
            reset_pause: Duration::from_secs(1),
        }
    }
}

/// Meter constants turning ticks into physical units.
#[derive(Debug, Clone)]
pub struct Calibration {
    pub used_water_ticks_per_liter: f64,
    pub solar_loop_ticks_per_liter: f64,
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

/// Physical installation constants.
#[derive(Debug, Clone)]
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

/// Counter persistence policy.
#[derive(Debug, Clone)]
pub struct FlushCfg {
    /// Opportunistic save interval while running; shutdown always saves.
    pub period: Duration,
}

impl Default for FlushCfg {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(600),
        }
    }
}

/// Everything `Pipeline::start` needs besides the transport and the store.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub supervisor: SupervisorCfg,
    pub calibration: Calibration,
    pub installation: Installation,
    pub flush: FlushCfg,
}
