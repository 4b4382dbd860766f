//! Heat transfer model for water circuits and the storage tank.
//!
//! The tank is treated as a single node:
//!
//! ```text
//!        +---- hot water          (hot_water_c)
//!        |
//!   /----+----\
//!   |         |  top              (tank_top_c)
//!   |        Z|  auxiliary heater
//!   |         |  stored water     (lumped)
//!   |        Z|  solar exchanger  (in exchanger_in_c, out exchanger_out_c)
//!   |         |  bottom           (tank_bottom_c)
//!   \----+----/
//!        +---- cold water         (cold_water_c)
//! ```

/// Specific heat of water at operating temperature, J/(kg·K).
pub const CP_WATER: f64 = 4179.6;
/// Density of water, kg/m³.
pub const RHO_WATER: f64 = 1000.0;
/// Joules in one kilowatt-hour.
pub const JOULES_PER_KWH: f64 = 3_600_000.0;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;
pub const LITERS_PER_M3: f64 = 1_000.0;

/// Heat carried by `volume_m3` of water cooling from `temp_in_c` to `temp_out_c`.
///
/// Positive when the water gives heat away (in warmer than out).
#[inline]
pub fn water_energy_j(volume_m3: f64, temp_in_c: f64, temp_out_c: f64) -> f64 {
    volume_m3 * RHO_WATER * CP_WATER * (temp_in_c - temp_out_c)
}

/// Single-node approximation of the tank temperature.
#[inline]
pub fn stored_temp_c(temp_bottom_c: f64, temp_top_c: f64) -> f64 {
    (temp_bottom_c + temp_top_c) / 2.0
}

/// Energy needed to raise `volume_m3` of stored water by `delta_k`.
#[inline]
pub fn deg_to_joules(delta_k: f64, volume_m3: f64) -> f64 {
    delta_k * CP_WATER * volume_m3 * RHO_WATER
}

/// Temperature change of `volume_m3` of stored water receiving `joules`.
#[inline]
pub fn joules_to_deg(joules: f64, volume_m3: f64) -> f64 {
    joules / (CP_WATER * volume_m3 * RHO_WATER)
}

#[inline]
pub fn joules_to_kwh(joules: f64) -> f64 {
    joules / JOULES_PER_KWH
}

#[inline]
pub fn seconds_to_hours(seconds: f64) -> f64 {
    seconds / SECONDS_PER_HOUR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn one_liter_one_kelvin() {
        let j = water_energy_j(0.001, 16.0, 15.0);
        assert!(close(j, 4179.6));
        assert!(close(joules_to_kwh(j) * 1000.0, 1.161));
    }

    #[test]
    fn sign_follows_heat_direction() {
        assert!(water_energy_j(0.01, 40.0, 45.0) < 0.0);
        assert_eq!(water_energy_j(0.0, 80.0, 10.0), 0.0);
    }

    #[test]
    fn storage_conversions_are_inverse() {
        let j = deg_to_joules(2.5, 0.3);
        assert!(close(j, 2.5 * 4179.6 * 300.0));
        assert!(close(joules_to_deg(j, 0.3), 2.5));
        assert_eq!(stored_temp_c(40.0, 60.0), 50.0);
        assert_eq!(seconds_to_hours(5400.0), 1.5);
    }
}
