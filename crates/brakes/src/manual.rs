//! Hand-wound brakes. The applied level is a percentage that follows the brakesman's target at
//! the car's application and release rates (percent per second).

use serde::{Deserialize, Serialize};

use crate::params::BrakeParams;
use crate::state::BrakeState;
use crate::transfer::{Approach, apply_forces, approach};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualBrake {
    pub target_percent: f64,
    pub applied_percent: f64,
}

impl ManualBrake {
    pub fn released() -> Self {
        Self {
            target_percent: 0.0,
            applied_percent: 0.0,
        }
    }

    pub fn set_target(&mut self, percent: f64) {
        self.target_percent = percent.clamp(0.0, 100.0);
    }
}

pub fn advance(params: &BrakeParams, state: &mut BrakeState, brake: &mut ManualBrake, dt: f64) {
    let limits = Approach::new(
        params.max_release_rate_psi_s,
        params.max_application_rate_psi_s,
        0.0,
    );
    let target = brake.target_percent.clamp(0.0, 100.0);
    brake.applied_percent = approach(brake.applied_percent, target, limits, dt).clamp(0.0, 100.0);
    update_forces(params, state, brake);
}

pub fn update_forces(params: &BrakeParams, state: &mut BrakeState, brake: &ManualBrake) {
    apply_forces(params, state, brake.applied_percent / 100.0);
}

pub fn initialize(params: &BrakeParams, state: &mut BrakeState, brake: &mut ManualBrake) {
    *brake = ManualBrake::released();
    update_forces(params, state, brake);
}
