//! Vacuum brake families. Pressures are absolute psi; full vacuum sits at the bottom of the
//! band and atmosphere at the top.

use railbrake_core::constants::ONE_ATMOSPHERE_PSI;
use serde::{Deserialize, Serialize};

use crate::params::BrakeParams;
use crate::state::BrakeState;
use crate::transfer::{Approach, apply_forces, approach};

/// Lowest absolute pressure a vacuum car can reach.
pub fn band_floor_psia(params: &BrakeParams) -> f64 {
    (ONE_ATMOSPHERE_PSI - params.pressure_band_psi).max(0.0)
}

fn clamp_to_band(params: &BrakeParams, value: f64) -> f64 {
    value.clamp(band_floor_psia(params), ONE_ATMOSPHERE_PSI)
}

/// Straight vacuum: the cylinder follows the pipe and force grows with vacuum.
pub mod straight {
    use super::*;

    pub fn advance(params: &BrakeParams, state: &mut BrakeState, dt: f64) {
        let limits = Approach::new(
            params.max_release_rate_psi_s,
            params.max_application_rate_psi_s,
            params.volume_ratio(),
        );
        let cylinder = approach(state.cylinder_psi, state.pipe_psi, limits, dt);
        state.cylinder_psi = clamp_to_band(params, cylinder);
        update_forces(params, state);
    }

    pub fn update_forces(params: &BrakeParams, state: &mut BrakeState) {
        let fraction = if params.max_cylinder_pressure_psi > 0.0 {
            (ONE_ATMOSPHERE_PSI - state.cylinder_psi) / params.max_cylinder_pressure_psi
        } else {
            0.0
        };
        apply_forces(params, state, fraction);
    }

    /// Pipe and cylinder equalised at `pipe_psia`.
    pub fn initialize(params: &BrakeParams, state: &mut BrakeState, pipe_psia: f64) {
        let pressure = clamp_to_band(params, pipe_psia);
        state.pipe_psi = pressure;
        state.cylinder_psi = pressure;
        update_forces(params, state);
    }
}

/// Automatic vacuum: a reservoir on the upper side of the piston holds vacuum through a
/// non-return valve; admitting air to the pipe applies the brake.
pub mod automatic {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct VacuumReservoir {
        pub pressure_psia: f64,
    }

    impl VacuumReservoir {
        pub fn at_atmosphere() -> Self {
            Self {
                pressure_psia: ONE_ATMOSPHERE_PSI,
            }
        }
    }

    pub fn advance(
        params: &BrakeParams,
        state: &mut BrakeState,
        reservoir: &mut VacuumReservoir,
        dt: f64,
    ) {
        // non-return valve: the reservoir is only ever evacuated toward the pipe
        if state.pipe_psi < reservoir.pressure_psia {
            let limits = Approach::new(params.max_release_rate_psi_s, 0.0, 0.0);
            let evacuated = approach(reservoir.pressure_psia, state.pipe_psi, limits, dt);
            reservoir.pressure_psia = clamp_to_band(params, evacuated);
        }

        let limits = Approach::new(
            params.max_release_rate_psi_s,
            params.max_application_rate_psi_s,
            params.volume_ratio(),
        );
        let cylinder = approach(state.cylinder_psi, state.pipe_psi, limits, dt);
        // the lower chamber never holds a harder vacuum than the reservoir side
        state.cylinder_psi = clamp_to_band(params, cylinder).max(reservoir.pressure_psia);
        update_forces(params, state, reservoir);
    }

    pub fn update_forces(
        params: &BrakeParams,
        state: &mut BrakeState,
        reservoir: &VacuumReservoir,
    ) {
        let fraction = if params.max_cylinder_pressure_psi > 0.0 {
            (state.cylinder_psi - reservoir.pressure_psia) / params.max_cylinder_pressure_psi
        } else {
            0.0
        };
        apply_forces(params, state, fraction);
    }

    /// Reservoir fully evacuated; pipe and lower chamber at `pipe_psia`.
    pub fn initialize(
        params: &BrakeParams,
        state: &mut BrakeState,
        reservoir: &mut VacuumReservoir,
        pipe_psia: f64,
    ) {
        let pressure = clamp_to_band(params, pipe_psia);
        reservoir.pressure_psia = band_floor_psia(params);
        state.pipe_psi = pressure;
        state.cylinder_psi = pressure;
        update_forces(params, state, reservoir);
    }
}

#[cfg(test)]
mod tests {
    use super::automatic::VacuumReservoir;
    use super::*;

    fn released_state(params: &BrakeParams) -> BrakeState {
        BrakeState::at_pressure(band_floor_psia(params))
    }

    #[test]
    fn straight_cylinder_follows_pipe_toward_atmosphere() {
        let params = BrakeParams::default();
        let mut state = BrakeState::at_pressure(ONE_ATMOSPHERE_PSI - 8.0);
        state.pipe_psi = ONE_ATMOSPHERE_PSI;
        straight::update_forces(&params, &mut state);

        let mut gap = ONE_ATMOSPHERE_PSI - state.cylinder_psi;
        let mut force = state.retard_force_n;
        for _ in 0..50 {
            straight::advance(&params, &mut state, 0.5);
            let new_gap = ONE_ATMOSPHERE_PSI - state.cylinder_psi;
            assert!(new_gap < gap, "gap must strictly shrink");
            assert!(state.retard_force_n < force, "force must strictly fall");
            assert!(state.cylinder_psi <= ONE_ATMOSPHERE_PSI);
            gap = new_gap;
            force = state.retard_force_n;
        }
    }

    #[test]
    fn straight_cylinder_equal_to_pipe_is_a_fixed_point() {
        let params = BrakeParams::default();
        let mut state = BrakeState::at_pressure(ONE_ATMOSPHERE_PSI - 5.0);
        straight::advance(&params, &mut state, 1.0);
        assert_eq!(state.cylinder_psi, ONE_ATMOSPHERE_PSI - 5.0);
        assert_eq!(state.pipe_psi, ONE_ATMOSPHERE_PSI - 5.0);
    }

    #[test]
    fn straight_step_leaves_the_pipe_alone() {
        let params = BrakeParams::default();
        let mut state = released_state(&params);
        state.pipe_psi = ONE_ATMOSPHERE_PSI - 2.0;
        straight::advance(&params, &mut state, 1.0);
        assert_eq!(state.pipe_psi, ONE_ATMOSPHERE_PSI - 2.0);
    }

    #[test]
    fn straight_cylinder_stays_in_band_under_huge_steps() {
        let params = BrakeParams::default();
        let mut state = released_state(&params);
        state.pipe_psi = 0.0;
        straight::advance(&params, &mut state, 1e6);
        assert!(state.cylinder_psi >= band_floor_psia(&params));
    }

    #[test]
    fn automatic_is_released_when_pipe_matches_reservoir() {
        let params = BrakeParams::default();
        let mut state = BrakeState::at_pressure(ONE_ATMOSPHERE_PSI);
        let mut reservoir = VacuumReservoir::at_atmosphere();
        automatic::initialize(&params, &mut state, &mut reservoir, band_floor_psia(&params));
        assert_eq!(state.retard_force_n, 0.0);

        for _ in 0..20 {
            automatic::advance(&params, &mut state, &mut reservoir, 0.5);
        }
        assert_eq!(state.retard_force_n, 0.0);
    }

    #[test]
    fn automatic_applies_when_air_enters_the_pipe() {
        let params = BrakeParams::default();
        let mut state = BrakeState::at_pressure(ONE_ATMOSPHERE_PSI);
        let mut reservoir = VacuumReservoir::at_atmosphere();
        automatic::initialize(&params, &mut state, &mut reservoir, band_floor_psia(&params));

        state.pipe_psi = ONE_ATMOSPHERE_PSI;
        let mut force = state.retard_force_n;
        for _ in 0..80 {
            automatic::advance(&params, &mut state, &mut reservoir, 0.5);
            assert!(state.retard_force_n >= force);
            force = state.retard_force_n;
        }
        // reservoir kept its vacuum through the non-return valve
        assert_eq!(reservoir.pressure_psia, band_floor_psia(&params));
        assert!((force - params.max_brake_force_n).abs() < 1e-3);
    }
}
