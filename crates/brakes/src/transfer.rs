//! Building blocks shared by every brake family.
//!
//! [`approach`] moves one pressure toward another with a rate limit and a volume-ratio guard,
//! which keeps the source and the receiver from crossing when both hold compressible volumes.
//! [`apply_forces`] turns an application fraction into the retarding and rail forces.

use crate::params::BrakeParams;
use crate::state::BrakeState;

/// Rate limits and guard ratio for one [`approach`] step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approach {
    /// Rate used when the target is below the current value.
    pub rate_down: f64,
    /// Rate used when the target is above the current value.
    pub rate_up: f64,
    /// Receiver-to-source volume ratio. Zero disables the guard.
    pub volume_ratio: f64,
}

impl Approach {
    pub fn new(rate_down: f64, rate_up: f64, volume_ratio: f64) -> Self {
        Self {
            rate_down,
            rate_up,
            volume_ratio: volume_ratio.max(0.0),
        }
    }
}

/// Advance `current` toward `target` over `dt` seconds.
///
/// The change per step is `dt * rate`, reduced to `(current - target) / (1 + ratio)` when the
/// full step would overshoot the equalisation point. The result never crosses `target`.
pub fn approach(current: f64, target: f64, limits: Approach, dt: f64) -> f64 {
    let vr = limits.volume_ratio;
    if target < current {
        let mut dp = dt * limits.rate_down;
        if current - dp < target + dp * vr {
            dp = (current - target) / (1.0 + vr);
        }
        current - dp
    } else if target > current {
        let mut dp = dt * limits.rate_up;
        if current + dp > target - dp * vr {
            dp = (target - current) / (1.0 + vr);
        }
        current + dp
    } else {
        current
    }
}

/// Derive the car forces from an application fraction in `[0, 1]`.
///
/// The handbrake acts as a floor; a stuck brake overrides both.
pub fn apply_forces(params: &BrakeParams, state: &mut BrakeState, fraction: f64) {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let force = if state.stuck {
        params
            .max_brake_force_n
            .max(params.max_handbrake_force_n / 2.0)
    } else {
        let handbrake = params.max_handbrake_force_n * state.handbrake_percent / 100.0;
        (params.max_brake_force_n * fraction).max(handbrake)
    };

    state.retard_force_n = force * params.retard_friction_factor;
    state.brake_force_n = if state.skid {
        force * params.skid_friction
    } else {
        force * params.shoe_friction_factor
    };
}

/// Brake force with its sign set against the direction of motion.
pub fn signed_force(brake_force_n: f64, speed_mps: f64) -> f64 {
    if speed_mps > 0.0 {
        -brake_force_n
    } else if speed_mps < 0.0 {
        brake_force_n
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_gap_is_closed_without_overshoot() {
        let limits = Approach::new(5.0, 5.0, 0.0);
        assert_eq!(approach(10.0, 9.5, limits, 1.0), 9.5);
        assert_eq!(approach(9.5, 10.0, limits, 1.0), 10.0);
    }

    #[test]
    fn volume_ratio_splits_the_gap() {
        let limits = Approach::new(100.0, 100.0, 1.0);
        // both sides would move, so the receiver only covers half the gap
        assert!((approach(10.0, 6.0, limits, 1.0) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn large_gap_is_rate_limited() {
        let limits = Approach::new(2.0, 3.0, 0.5);
        assert!((approach(10.0, 0.0, limits, 0.5) - 9.0).abs() < 1e-12);
        assert!((approach(0.0, 10.0, limits, 0.5) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn convergence_is_monotonic() {
        let limits = Approach::new(1.0, 1.0, 0.3);
        let mut value = 0.0;
        let mut previous_gap = f64::INFINITY;
        for _ in 0..200 {
            value = approach(value, 4.0, limits, 0.1);
            let gap = 4.0 - value;
            assert!(gap >= 0.0);
            assert!(gap <= previous_gap);
            previous_gap = gap;
        }
        assert!(previous_gap < 1e-6);
    }

    #[test]
    fn handbrake_is_a_floor() {
        let params = BrakeParams::default();
        let mut state = BrakeState::at_pressure(0.0);
        state.handbrake_percent = 100.0;
        apply_forces(&params, &mut state, 0.0);
        assert_eq!(state.retard_force_n, params.max_handbrake_force_n);
        apply_forces(&params, &mut state, 1.0);
        assert_eq!(state.retard_force_n, params.max_brake_force_n);
    }

    #[test]
    fn stuck_brake_overrides_fraction() {
        let params = BrakeParams::default();
        let mut state = BrakeState::at_pressure(0.0);
        state.stuck = true;
        apply_forces(&params, &mut state, 0.0);
        assert_eq!(state.retard_force_n, params.max_brake_force_n);
    }

    #[test]
    fn stuck_brake_uses_half_handbrake_when_stronger() {
        let params = BrakeParams {
            max_brake_force_n: 1_000.0,
            max_handbrake_force_n: 6_000.0,
            ..BrakeParams::default()
        };
        let mut state = BrakeState::at_pressure(0.0);
        state.stuck = true;
        for fraction in [0.0, 0.5, 1.0] {
            apply_forces(&params, &mut state, fraction);
            assert_eq!(state.retard_force_n, 3_000.0);
        }
    }

    #[test]
    fn skid_uses_skid_friction() {
        let params = BrakeParams::default();
        let mut state = BrakeState::at_pressure(0.0);
        state.skid = true;
        apply_forces(&params, &mut state, 1.0);
        let expected = params.max_brake_force_n * params.skid_friction;
        assert!((state.brake_force_n - expected).abs() < 1e-9);
    }

    #[test]
    fn force_opposes_motion() {
        assert_eq!(signed_force(100.0, 3.0), -100.0);
        assert_eq!(signed_force(100.0, -3.0), 100.0);
        assert_eq!(signed_force(100.0, 0.0), 0.0);
    }
}
