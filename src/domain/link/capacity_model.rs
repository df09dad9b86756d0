use std::f64::consts::PI;

use crate::api::experiment_config_dto::CapacityModelDto;
use crate::domain::config::LinkBudgetConfig;
use crate::error::ConversionError;

/// Boltzmann constant in J/K.
pub const BOLTZMANN_CONSTANT: f64 = 1.38e-23;

/// Free space path loss constant for distance in m and frequency in Hz (dB).
const FSPL_CONSTANT_DB: f64 = 147.55;

/// Selects how the per-step transmission budget is derived from the orbit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapacityModel {
    /// Free space link budget and Shannon-Hartley capacity, in Mbps.
    ShannonHartley,

    /// Legacy heuristic scaling `max_capacity` with the inverse square of the
    /// slant range, normalised to the closest approach.
    InverseSquare { max_capacity: f64 },

    /// Fixed budget, independent of the orbit.
    Constant { capacity: f64 },
}

impl CapacityModel {
    /// Instantaneous capacity at `step`. Pure and never negative.
    pub fn capacity(&self, step: u64, link: &LinkBudgetConfig) -> f64 {
        let capacity = match self {
            CapacityModel::ShannonHartley => shannon_capacity_mbps(step, link),
            CapacityModel::InverseSquare { max_capacity } => inverse_square_capacity(step, link, *max_capacity),
            CapacityModel::Constant { capacity } => *capacity,
        };

        capacity.max(0.0)
    }

    /// Capacity truncated to whole units for per-step accounting.
    pub fn capacity_budget(&self, step: u64, link: &LinkBudgetConfig) -> u64 {
        self.capacity(step, link) as u64
    }
}

impl TryFrom<CapacityModelDto> for CapacityModel {
    type Error = ConversionError;

    fn try_from(dto: CapacityModelDto) -> Result<Self, Self::Error> {
        match dto.typ.as_str() {
            "ShannonHartley" => Ok(CapacityModel::ShannonHartley),
            "InverseSquare" => {
                let max_capacity = dto.max_capacity.ok_or_else(|| ConversionError::MissingField(dto.typ.clone(), "maxCapacity"))?;
                if !(max_capacity > 0.0) {
                    return Err(ConversionError::NonPositive("maxCapacity"));
                }
                Ok(CapacityModel::InverseSquare { max_capacity })
            }
            "Constant" => {
                let capacity = dto.capacity.ok_or_else(|| ConversionError::MissingField(dto.typ.clone(), "capacity"))?;
                if capacity < 0.0 {
                    return Err(ConversionError::OutOfRange { name: "capacity", value: capacity });
                }
                Ok(CapacityModel::Constant { capacity })
            }
            _ => Err(ConversionError::UnknownCapacityModel(dto.typ)),
        }
    }
}

/// Straight line distance (km) between the orbiter and the fixed relay.
///
/// The relay sits at `(r_relay, 0)`, the orbiter moves on a circle of radius
/// `r_orbiter` and reaches angle `2π·step / period` at `step`.
pub fn slant_distance_km(step: u64, link: &LinkBudgetConfig) -> f64 {
    let r_relay = link.relay_altitude_km + link.earth_radius_km;
    let r_orbiter = link.orbiter_altitude_km + link.earth_radius_km;

    let angle_rad = (2.0 * PI * step as f64) / link.orbital_period_steps as f64;
    let orbiter_x = r_orbiter * angle_rad.cos();
    let orbiter_y = r_orbiter * angle_rad.sin();

    ((r_relay - orbiter_x).powi(2) + orbiter_y.powi(2)).sqrt()
}

/// Free space path loss in dB.
pub fn free_space_path_loss_db(distance_km: f64, frequency_ghz: f64) -> f64 {
    let distance_m = distance_km * 1000.0;
    let frequency_hz = frequency_ghz * 1e9;

    20.0 * distance_m.log10() + 20.0 * frequency_hz.log10() - FSPL_CONSTANT_DB
}

/// Thermal noise power `k·T·B` in W.
pub fn thermal_noise_w(link: &LinkBudgetConfig) -> f64 {
    BOLTZMANN_CONSTANT * link.system_noise_temperature_k * link.channel_bandwidth_mhz * 1e6
}

/// Received signal power in W at the given slant range.
pub fn received_power_w(distance_km: f64, link: &LinkBudgetConfig) -> f64 {
    let transmit_power_dbw = 10.0 * link.transmit_power_w.log10();
    let received_power_dbw = transmit_power_dbw + link.transmit_antenna_gain_dbi + link.receive_antenna_gain_dbi
        - free_space_path_loss_db(distance_km, link.frequency_ghz);

    10f64.powf(received_power_dbw / 10.0)
}

/// `C = B·log2(1 + S/N)` converted to Mbps.
pub fn shannon_capacity_mbps(step: u64, link: &LinkBudgetConfig) -> f64 {
    let distance_km = slant_distance_km(step, link);
    let snr = received_power_w(distance_km, link) / thermal_noise_w(link);
    let capacity_bps = link.channel_bandwidth_mhz * 1e6 * (1.0 + snr).log2();

    capacity_bps / 1e6
}

fn inverse_square_capacity(step: u64, link: &LinkBudgetConfig, max_capacity: f64) -> f64 {
    let min_distance = link.relay_altitude_km - link.orbiter_altitude_km;
    let distance_km = slant_distance_km(step, link);

    if distance_km > 0.0 { max_capacity * (min_distance / distance_km).powi(2) } else { max_capacity }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shannon_capacity_matches_reference_values() {
        let link = LinkBudgetConfig::default();

        // Closest approach at step 0, farthest at half the orbital period.
        assert!((shannon_capacity_mbps(0, &link) - 1013.248).abs() < 0.01);
        assert!((shannon_capacity_mbps(1000, &link) - 684.974).abs() < 0.01);
        assert!((shannon_capacity_mbps(500, &link) - 814.097).abs() < 0.01);
    }

    #[test]
    fn shannon_capacity_is_periodic_and_symmetric() {
        let link = LinkBudgetConfig::default();
        let model = CapacityModel::ShannonHartley;

        assert!((model.capacity(0, &link) - model.capacity(2000, &link)).abs() < 1e-9);
        assert!((model.capacity(300, &link) - model.capacity(1700, &link)).abs() < 1e-6);
    }

    #[test]
    fn closest_approach_distance() {
        let link = LinkBudgetConfig::default();

        assert!((slant_distance_km(0, &link) - (35786.0 - 550.0)).abs() < 1e-6);
        assert!((slant_distance_km(1000, &link) - (35786.0 + 550.0 + 2.0 * 6371.0)).abs() < 1e-6);
    }

    #[test]
    fn inverse_square_peaks_at_max_capacity() {
        let link = LinkBudgetConfig::default();
        let model = CapacityModel::InverseSquare { max_capacity: 150.0 };

        assert!((model.capacity(0, &link) - 150.0).abs() < 1e-9);
        assert!(model.capacity(1000, &link) < 150.0);
        assert_eq!(model.capacity_budget(0, &link), 150);
    }

    #[test]
    fn budget_is_truncated() {
        let link = LinkBudgetConfig::default();

        assert_eq!(CapacityModel::ShannonHartley.capacity_budget(0, &link), 1013);
        assert_eq!(CapacityModel::Constant { capacity: 42.9 }.capacity_budget(7, &link), 42);
    }

    #[test]
    fn inverse_square_requires_max_capacity() {
        let dto = CapacityModelDto { typ: "InverseSquare".to_string(), max_capacity: None, capacity: None };

        assert_eq!(CapacityModel::try_from(dto).unwrap_err(), ConversionError::MissingField("InverseSquare".to_string(), "maxCapacity"));
    }

    #[test]
    fn unknown_model_is_rejected() {
        let dto = CapacityModelDto { typ: "Rayleigh".to_string(), max_capacity: None, capacity: None };

        assert_eq!(CapacityModel::try_from(dto).unwrap_err(), ConversionError::UnknownCapacityModel("Rayleigh".to_string()));
    }
}
