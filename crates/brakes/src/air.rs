//! Automatic air brake with a single-pipe triple valve. Pressures are gauge psi.
//!
//! Reducing the pipe below the auxiliary reservoir applies the brake by feeding reservoir air
//! into the cylinder. Raising the pipe above the reservoir vents the cylinder and recharges the
//! reservoir from the pipe. The valve holds its position between ticks: once in release it
//! keeps venting the cylinder until the pipe drops below the reservoir again.

use serde::{Deserialize, Serialize};

use crate::params::BrakeParams;
use crate::state::BrakeState;
use crate::transfer::{Approach, apply_forces, approach};

/// Pressure difference the slide ignores.
pub const SLIDE_TOLERANCE_PSI: f64 = 1e-6;

/// Position of the triple valve slide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValvePosition {
    #[default]
    Release,
    Apply,
    Lap,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripleValve {
    pub aux_reservoir_psi: f64,
    #[serde(default)]
    pub position: ValvePosition,
}

impl TripleValve {
    pub fn empty() -> Self {
        Self {
            aux_reservoir_psi: 0.0,
            position: ValvePosition::Release,
        }
    }

    /// Move the slide for the current pipe and reservoir pressures.
    ///
    /// Pressures within [`SLIDE_TOLERANCE_PSI`] of each other leave a releasing valve in
    /// release and lap an applying one.
    fn shift(&mut self, pipe: f64) {
        let aux = self.aux_reservoir_psi;
        self.position = if pipe > aux + SLIDE_TOLERANCE_PSI {
            ValvePosition::Release
        } else if pipe < aux - SLIDE_TOLERANCE_PSI {
            ValvePosition::Apply
        } else if self.position == ValvePosition::Apply {
            ValvePosition::Lap
        } else {
            self.position
        };
    }
}

fn clamp_to_band(params: &BrakeParams, value: f64) -> f64 {
    value.clamp(0.0, params.pressure_band_psi.max(0.0))
}

pub fn advance(params: &BrakeParams, state: &mut BrakeState, valve: &mut TripleValve, dt: f64) {
    let pipe = state.pipe_psi;
    let aux = valve.aux_reservoir_psi;
    let aux_ratio = params.aux_volume_ratio();
    valve.shift(pipe);

    match valve.position {
        ValvePosition::Apply => {
            // reservoir air equalises into the cylinder
            if state.cylinder_psi < aux {
                let limits = Approach::new(0.0, params.max_application_rate_psi_s, aux_ratio);
                let mut dp = approach(state.cylinder_psi, aux, limits, dt) - state.cylinder_psi;
                let mut new_aux = aux - dp * aux_ratio;
                if aux_ratio > 0.0 && new_aux < pipe {
                    // the reservoir is never drawn below the pipe; stop exactly on it to lap
                    dp = (aux - pipe) / aux_ratio;
                    new_aux = pipe;
                    valve.position = ValvePosition::Lap;
                }
                state.cylinder_psi += dp;
                valve.aux_reservoir_psi = new_aux;
            }
        }
        ValvePosition::Release => {
            let vent = Approach::new(params.max_release_rate_psi_s, 0.0, 0.0);
            state.cylinder_psi = approach(state.cylinder_psi, 0.0, vent, dt);
            if pipe > aux {
                let charge = Approach::new(0.0, params.aux_charging_rate_psi_s, 0.0);
                valve.aux_reservoir_psi = approach(aux, pipe, charge, dt);
            }
        }
        ValvePosition::Lap => {}
    }

    state.cylinder_psi = clamp_to_band(params, state.cylinder_psi);
    valve.aux_reservoir_psi = clamp_to_band(params, valve.aux_reservoir_psi);
    update_forces(params, state);
}

pub fn update_forces(params: &BrakeParams, state: &mut BrakeState) {
    let fraction = if params.max_cylinder_pressure_psi > 0.0 {
        state.cylinder_psi / params.max_cylinder_pressure_psi
    } else {
        0.0
    };
    apply_forces(params, state, fraction);
}

/// Charge the reservoir to the full band, then reduce the pipe to `pipe_psi` and let the
/// triple valve settle.
pub fn initialize(
    params: &BrakeParams,
    state: &mut BrakeState,
    valve: &mut TripleValve,
    pipe_psi: f64,
) {
    let supply = params.pressure_band_psi.max(0.0);
    let pipe = clamp_to_band(params, pipe_psi);
    let aux_ratio = params.aux_volume_ratio();

    let cylinder = if aux_ratio > 0.0 {
        ((supply - pipe) / aux_ratio).min(supply / (1.0 + aux_ratio))
    } else {
        0.0
    };
    state.pipe_psi = pipe;
    state.cylinder_psi = clamp_to_band(params, cylinder);
    valve.aux_reservoir_psi = clamp_to_band(params, supply - state.cylinder_psi * aux_ratio);
    valve.position = if state.cylinder_psi > 0.0 {
        ValvePosition::Lap
    } else {
        ValvePosition::Release
    };
    update_forces(params, state);
}
