//! Lead locomotive pipe propagation.
//!
//! Only the lead's pipe is integrated here. Rates are quoted for a reference train volume and
//! rescaled by the actual train volumes before use: the charging device (ejector or compressor
//! feed) runs slower on a train with more cylinder volume, while service venting and leakage
//! take longer on a larger system.

use railbrake_core::constants::{ONE_ATMOSPHERE_PSI, REFERENCE_TRAIN_VOLUME_M3};
use serde::{Deserialize, Serialize};

use crate::system::BrakeSystemKind;

/// Driver's brake controller position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    #[default]
    Release,
    Lap,
    Apply,
    Emergency,
}

impl ControllerState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Lap => "lap",
            Self::Apply => "apply",
            Self::Emergency => "emergency",
        }
    }
}

/// Lead equipment settings feeding one propagation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeadPipeInput {
    pub controller: ControllerState,
    pub charging_device_on: bool,
    /// Ejector or feed valve rate for the reference train, psi/s.
    pub charging_rate_psi_s: f64,
    /// Leak rate for the reference train, psi/s.
    pub leak_rate_psi_s: f64,
    /// Time constant of controller venting for the reference train, s.
    pub service_time_factor_s: f64,
    /// Pipe change between released and full service.
    pub full_service_reduction_psi: f64,
    /// Maximum pipe swing: vacuum below atmosphere, or air supply pressure.
    pub pressure_band_psi: f64,
}

/// Aggregate train volumes, recomputed by the train before every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainVolumes {
    pub pipe_m3: f64,
    pub cylinder_m3: f64,
    pub system_m3: f64,
    /// System volume of the cars pneumatically connected to the lead.
    pub current_system_m3: f64,
}

impl TrainVolumes {
    /// Multiplier on the charging device rate.
    pub fn charging_scale(&self) -> f64 {
        if self.cylinder_m3 > 0.0 {
            REFERENCE_TRAIN_VOLUME_M3 / self.cylinder_m3
        } else {
            1.0
        }
    }

    /// Multiplier on the service time factor and the leak rate.
    pub fn service_scale(&self) -> f64 {
        if self.system_m3 > 0.0 {
            self.system_m3 / REFERENCE_TRAIN_VOLUME_M3
        } else {
            1.0
        }
    }
}

/// Fractional change of one venting step, `dt / T`. A zero time constant vents at once.
fn vent_fraction(dt: f64, time_factor_s: f64) -> f64 {
    if time_factor_s > 0.0 {
        dt / time_factor_s
    } else {
        f64::INFINITY
    }
}

/// Advance the lead pipe pressure of a train braked by `kind` over `dt` seconds.
pub fn propagate(
    kind: BrakeSystemKind,
    pipe_psi: f64,
    input: &LeadPipeInput,
    volumes: &TrainVolumes,
    dt: f64,
) -> f64 {
    if !dt.is_finite() || dt <= 0.0 {
        return pipe_psi;
    }
    let charge = if input.charging_device_on {
        input.charging_rate_psi_s * volumes.charging_scale()
    } else {
        0.0
    };
    let service_time = input.service_time_factor_s * volumes.service_scale();
    let leak = input.leak_rate_psi_s * volumes.service_scale();
    let vent = vent_fraction(dt, service_time);

    match kind {
        BrakeSystemKind::StraightVacuum => {
            let floor = (ONE_ATMOSPHERE_PSI - input.pressure_band_psi).max(0.0);
            let mut p = (pipe_psi - dt * charge).max(floor);
            if input.controller == ControllerState::Release {
                p = (p * (1.0 + vent)).min(ONE_ATMOSPHERE_PSI);
            }
            p += dt * leak;
            p.clamp(floor, ONE_ATMOSPHERE_PSI)
        }
        BrakeSystemKind::AutomaticVacuum => {
            let floor = (ONE_ATMOSPHERE_PSI - input.pressure_band_psi).max(0.0);
            let service = (floor + input.full_service_reduction_psi).min(ONE_ATMOSPHERE_PSI);
            let mut p = pipe_psi;
            match input.controller {
                ControllerState::Release => p = (p - dt * charge).max(floor),
                ControllerState::Lap => {}
                ControllerState::Apply => {
                    if p < service {
                        p = (p * (1.0 + vent)).min(service);
                    }
                }
                ControllerState::Emergency => p = ONE_ATMOSPHERE_PSI,
            }
            p += dt * leak;
            p.clamp(floor, ONE_ATMOSPHERE_PSI)
        }
        BrakeSystemKind::AutomaticAir => {
            let max = input.pressure_band_psi.max(0.0);
            let service = (max - input.full_service_reduction_psi).max(0.0);
            let mut p = pipe_psi;
            match input.controller {
                ControllerState::Release => p = (p + dt * charge).min(max),
                ControllerState::Lap => {}
                ControllerState::Apply => {
                    if p > service {
                        p = (p * (1.0 - vent)).max(service);
                    }
                }
                ControllerState::Emergency => p = 0.0,
            }
            p -= dt * leak;
            p.clamp(0.0, max)
        }
        BrakeSystemKind::Manual => pipe_psi,
    }
}
