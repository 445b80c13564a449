//! Static per-car brake ratings.

use railbrake_core::units::{ft3_to_m3, inhg_to_psi};
use serde::{Deserialize, Serialize};

/// Ratings fixed when a car enters the simulation; transfer functions never mutate them.
///
/// Rates are in psi/s for pipe-braked cars and in percent/s for manual brakes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrakeParams {
    pub max_application_rate_psi_s: f64,
    pub max_release_rate_psi_s: f64,
    pub cylinder_volume_m3: f64,
    pub num_cylinders: u32,
    pub pipe_volume_m3: f64,
    /// Pressure swing at which the cylinder delivers full force.
    pub max_cylinder_pressure_psi: f64,
    /// Width of the physical band: maximum vacuum below atmosphere for vacuum systems,
    /// supply pressure for air systems.
    pub pressure_band_psi: f64,
    pub max_brake_force_n: f64,
    pub max_handbrake_force_n: f64,
    /// Shoe friction adjustment applied to the retarding force at the wheel tread.
    pub retard_friction_factor: f64,
    /// Shoe friction adjustment applied to the force transmitted to the rail.
    pub shoe_friction_factor: f64,
    pub skid_friction: f64,
    pub aux_reservoir_volume_m3: f64,
    pub aux_charging_rate_psi_s: f64,
}

impl Default for BrakeParams {
    /// A four-wheeled vacuum-braked goods wagon.
    fn default() -> Self {
        Self {
            max_application_rate_psi_s: 2.0,
            max_release_rate_psi_s: 2.0,
            cylinder_volume_m3: ft3_to_m3(1.8),
            num_cylinders: 1,
            pipe_volume_m3: ft3_to_m3(1.5),
            max_cylinder_pressure_psi: inhg_to_psi(21.0),
            pressure_band_psi: inhg_to_psi(21.0),
            max_brake_force_n: 20_000.0,
            max_handbrake_force_n: 10_000.0,
            retard_friction_factor: 1.0,
            shoe_friction_factor: 1.0,
            skid_friction: 0.08,
            aux_reservoir_volume_m3: 0.0,
            aux_charging_rate_psi_s: 0.0,
        }
    }
}

impl BrakeParams {
    /// Air-braked freight car defaults (psig convention).
    pub fn air_wagon() -> Self {
        Self {
            max_application_rate_psi_s: 15.0,
            max_release_rate_psi_s: 10.0,
            cylinder_volume_m3: ft3_to_m3(0.7),
            num_cylinders: 1,
            pipe_volume_m3: ft3_to_m3(1.1),
            max_cylinder_pressure_psi: 64.0,
            pressure_band_psi: 90.0,
            aux_reservoir_volume_m3: ft3_to_m3(1.75),
            aux_charging_rate_psi_s: 2.0,
            ..Self::default()
        }
    }

    /// Total cylinder volume of the car.
    pub fn cylinder_volume_total_m3(&self) -> f64 {
        f64::from(self.num_cylinders) * self.cylinder_volume_m3
    }

    /// Cylinder-to-pipe volume ratio used by the overshoot guard.
    ///
    /// Recomputed on demand; it only reads static fields.
    pub fn volume_ratio(&self) -> f64 {
        if self.pipe_volume_m3 > 0.0 {
            self.cylinder_volume_total_m3() / self.pipe_volume_m3
        } else {
            0.0
        }
    }

    /// Cylinder-to-auxiliary-reservoir volume ratio of a triple valve.
    pub fn aux_volume_ratio(&self) -> f64 {
        if self.aux_reservoir_volume_m3 > 0.0 {
            self.cylinder_volume_total_m3() / self.aux_reservoir_volume_m3
        } else {
            0.0
        }
    }
}
