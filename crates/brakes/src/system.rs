//! Per-car brake equipment and the dispatch over brake families.

use railbrake_core::constants::ONE_ATMOSPHERE_PSI;
use serde::{Deserialize, Serialize};

use crate::air::{self, TripleValve};
use crate::manual::{self, ManualBrake};
use crate::params::BrakeParams;
use crate::state::BrakeState;
use crate::transfer::signed_force;
use crate::vacuum::automatic::{self, VacuumReservoir};
use crate::vacuum::{band_floor_psia, straight};

/// Brake family without its dynamic state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrakeSystemKind {
    StraightVacuum,
    AutomaticVacuum,
    AutomaticAir,
    Manual,
}

impl BrakeSystemKind {
    /// Pressure convention of the pipe: vacuum families share absolute psi.
    pub fn is_vacuum(self) -> bool {
        matches!(self, Self::StraightVacuum | Self::AutomaticVacuum)
    }

    pub fn has_pipe(self) -> bool {
        !matches!(self, Self::Manual)
    }

    /// Whether a pipe driven by `lead` can feed a car of this kind.
    pub fn pipe_compatible_with(self, lead: BrakeSystemKind) -> bool {
        match (self, lead) {
            (Self::Manual, _) => true,
            (Self::AutomaticAir, Self::AutomaticAir) => true,
            (a, b) => a.is_vacuum() && b.is_vacuum(),
        }
    }

    /// Pipe pressure of a fully released, charged train.
    pub fn released_pipe_psi(self, params: &BrakeParams) -> f64 {
        match self {
            Self::StraightVacuum => ONE_ATMOSPHERE_PSI,
            Self::AutomaticVacuum => band_floor_psia(params),
            Self::AutomaticAir => params.pressure_band_psi,
            Self::Manual => 0.0,
        }
    }

    /// Pipe pressure after a service application of `reduction_psi` from release.
    pub fn full_service_pipe_psi(self, params: &BrakeParams, reduction_psi: f64) -> f64 {
        match self {
            Self::StraightVacuum => ONE_ATMOSPHERE_PSI - reduction_psi,
            Self::AutomaticVacuum => band_floor_psia(params) + reduction_psi,
            Self::AutomaticAir => params.pressure_band_psi - reduction_psi,
            Self::Manual => 0.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StraightVacuum => "straight vacuum",
            Self::AutomaticVacuum => "automatic vacuum",
            Self::AutomaticAir => "automatic air",
            Self::Manual => "manual",
        }
    }
}

/// Family-specific state carried next to [`BrakeState`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BrakeSystem {
    StraightVacuum,
    AutomaticVacuum(VacuumReservoir),
    AutomaticAir(TripleValve),
    Manual(ManualBrake),
}

impl BrakeSystem {
    pub fn new(kind: BrakeSystemKind) -> Self {
        match kind {
            BrakeSystemKind::StraightVacuum => Self::StraightVacuum,
            BrakeSystemKind::AutomaticVacuum => {
                Self::AutomaticVacuum(VacuumReservoir::at_atmosphere())
            }
            BrakeSystemKind::AutomaticAir => Self::AutomaticAir(TripleValve::empty()),
            BrakeSystemKind::Manual => Self::Manual(ManualBrake::released()),
        }
    }

    pub fn kind(&self) -> BrakeSystemKind {
        match self {
            Self::StraightVacuum => BrakeSystemKind::StraightVacuum,
            Self::AutomaticVacuum(_) => BrakeSystemKind::AutomaticVacuum,
            Self::AutomaticAir(_) => BrakeSystemKind::AutomaticAir,
            Self::Manual(_) => BrakeSystemKind::Manual,
        }
    }
}

/// Brake equipment of a single car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarBrakes {
    pub params: BrakeParams,
    pub state: BrakeState,
    pub system: BrakeSystem,
}

impl CarBrakes {
    /// Equipment in the released, charged condition.
    pub fn new(kind: BrakeSystemKind, params: BrakeParams) -> Self {
        let mut brakes = Self {
            state: BrakeState::at_pressure(0.0),
            system: BrakeSystem::new(kind),
            params,
        };
        brakes.initialize_moving(kind.released_pipe_psi(&brakes.params));
        brakes
    }

    pub fn kind(&self) -> BrakeSystemKind {
        self.system.kind()
    }

    /// Advance the car by `dt` seconds against the pipe pressure already in its state.
    pub fn advance(&mut self, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let params = &self.params;
        let state = &mut self.state;
        match &mut self.system {
            BrakeSystem::StraightVacuum => straight::advance(params, state, dt),
            BrakeSystem::AutomaticVacuum(reservoir) => {
                automatic::advance(params, state, reservoir, dt)
            }
            BrakeSystem::AutomaticAir(valve) => air::advance(params, state, valve, dt),
            BrakeSystem::Manual(brake) => manual::advance(params, state, brake, dt),
        }
    }

    /// Recompute forces from the current pressures without moving any air.
    pub fn refresh_forces(&mut self) {
        let params = &self.params;
        let state = &mut self.state;
        match &self.system {
            BrakeSystem::StraightVacuum => straight::update_forces(params, state),
            BrakeSystem::AutomaticVacuum(reservoir) => {
                automatic::update_forces(params, state, reservoir)
            }
            BrakeSystem::AutomaticAir(_) => air::update_forces(params, state),
            BrakeSystem::Manual(brake) => manual::update_forces(params, state, brake),
        }
    }

    /// Stationary start: pipe and cylinder settled at `pipe_psi`, handbrake fully on when
    /// requested and fitted.
    pub fn initialize(&mut self, handbrake_on: bool, pipe_psi: f64) {
        let fitted = self.params.max_handbrake_force_n > 0.0;
        self.state.handbrake_percent = if handbrake_on && fitted { 100.0 } else { 0.0 };
        self.settle(pipe_psi);
    }

    /// Start in motion: handbrake released and pipe and cylinder settled at `pipe_psi`.
    pub fn initialize_moving(&mut self, pipe_psi: f64) {
        self.state.handbrake_percent = 0.0;
        self.settle(pipe_psi);
    }

    fn settle(&mut self, pipe_psi: f64) {
        let params = &self.params;
        let state = &mut self.state;
        match &mut self.system {
            BrakeSystem::StraightVacuum => straight::initialize(params, state, pipe_psi),
            BrakeSystem::AutomaticVacuum(reservoir) => {
                automatic::initialize(params, state, reservoir, pipe_psi)
            }
            BrakeSystem::AutomaticAir(valve) => air::initialize(params, state, valve, pipe_psi),
            BrakeSystem::Manual(brake) => manual::initialize(params, state, brake),
        }
    }

    pub fn set_handbrake(&mut self, percent: f64) {
        self.state.handbrake_percent = if self.params.max_handbrake_force_n > 0.0 {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.refresh_forces();
    }

    /// Target for a manual brake; ignored by pipe-braked cars.
    pub fn set_manual_target(&mut self, percent: f64) {
        if let BrakeSystem::Manual(brake) = &mut self.system {
            brake.set_target(percent);
        }
    }

    /// Force on the car, opposing the direction of motion.
    pub fn signed_brake_force(&self, speed_mps: f64) -> f64 {
        signed_force(self.state.brake_force_n, speed_mps)
    }

    /// Pressure of the family reservoir (vacuum reservoir or auxiliary reservoir), if any.
    pub fn reservoir_psi(&self) -> Option<f64> {
        match &self.system {
            BrakeSystem::AutomaticVacuum(reservoir) => Some(reservoir.pressure_psia),
            BrakeSystem::AutomaticAir(valve) => Some(valve.aux_reservoir_psi),
            BrakeSystem::StraightVacuum | BrakeSystem::Manual(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cars_start_released() {
        for (kind, params) in [
            (BrakeSystemKind::StraightVacuum, BrakeParams::default()),
            (BrakeSystemKind::AutomaticVacuum, BrakeParams::default()),
            (BrakeSystemKind::AutomaticAir, BrakeParams::air_wagon()),
            (BrakeSystemKind::Manual, BrakeParams::default()),
        ] {
            let car = CarBrakes::new(kind, params);
            assert_eq!(car.kind(), kind);
            assert_eq!(car.state.retard_force_n, 0.0, "{}", kind.label());
        }
    }

    #[test]
    fn stationary_start_sets_handbrake() {
        let mut car = CarBrakes::new(BrakeSystemKind::StraightVacuum, BrakeParams::default());
        car.initialize(true, ONE_ATMOSPHERE_PSI);
        assert_eq!(car.state.handbrake_percent, 100.0);
        assert_eq!(car.state.retard_force_n, car.params.max_handbrake_force_n);

        car.initialize_moving(ONE_ATMOSPHERE_PSI);
        assert_eq!(car.state.handbrake_percent, 0.0);
        assert_eq!(car.state.retard_force_n, 0.0);
    }

    #[test]
    fn handbrake_needs_a_fitted_handbrake() {
        let params = BrakeParams {
            max_handbrake_force_n: 0.0,
            ..BrakeParams::default()
        };
        let mut car = CarBrakes::new(BrakeSystemKind::StraightVacuum, params);
        car.set_handbrake(80.0);
        assert_eq!(car.state.handbrake_percent, 0.0);
    }

    #[test]
    fn non_positive_step_changes_nothing() {
        let mut car = CarBrakes::new(BrakeSystemKind::StraightVacuum, BrakeParams::default());
        car.state.pipe_psi = ONE_ATMOSPHERE_PSI - 5.0;
        let before = car.clone();
        car.advance(0.0);
        car.advance(-1.0);
        assert_eq!(car, before);
    }

    #[test]
    fn mixed_families_share_a_pipe_only_when_conventions_match() {
        use BrakeSystemKind::*;
        assert!(AutomaticVacuum.pipe_compatible_with(StraightVacuum));
        assert!(Manual.pipe_compatible_with(AutomaticAir));
        assert!(!AutomaticAir.pipe_compatible_with(AutomaticVacuum));
        assert!(!StraightVacuum.pipe_compatible_with(AutomaticAir));
    }
}
