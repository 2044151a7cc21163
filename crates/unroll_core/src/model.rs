//! Right-hand side and termination predicate of the unrolling model.
//!
//! With constant angular velocity omega the roll turns at a fixed rate,
//! paper leaves at the rim speed `r * omega`, and the radius changes by
//! `k` per radian turned. The model is time-invariant.

use crate::params::{RollState, RollSystem};
use crate::traits::{CrossingDirection, DynamicalSystem, EventFunction, Scalar};

/// (dtheta/dt, dy/dt, dr/dt) at the given state.
pub fn slope_func(state: &RollState, _t: f64, system: &RollSystem) -> [f64; 3] {
    let omega = system.omega;
    [omega, state.r * omega, system.k * omega]
}

/// Signed distance from the target length; crosses zero when the paper runs out.
pub fn event_func(state: &RollState, _t: f64, system: &RollSystem) -> f64 {
    state.y - system.length
}

impl<T: Scalar> DynamicalSystem<T> for RollSystem {
    fn dimension(&self) -> usize {
        RollState::DIM
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let omega = T::from_f64(self.omega).unwrap();
        let k = T::from_f64(self.k).unwrap();
        out[0] = omega;
        out[1] = x[2] * omega;
        out[2] = k * omega;
    }
}

impl EventFunction for RollSystem {
    fn eval(&self, t: f64, x: &[f64]) -> f64 {
        event_func(&RollState::from_slice(x), t, self)
    }

    fn direction(&self) -> CrossingDirection {
        CrossingDirection::Rising
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{estimate_k, make_system, RollParams, DEFAULT_OMEGA};

    #[test]
    fn slope_at_initial_state() {
        let params = RollParams::default();
        let system = make_system(&params).expect("system");
        let k = estimate_k(&params).expect("k");
        let slopes = slope_func(&system.init, 0.0, &system);
        assert_eq!(slopes, [DEFAULT_OMEGA, 0.02 * DEFAULT_OMEGA, k * DEFAULT_OMEGA]);
    }

    #[test]
    fn slope_is_time_invariant_and_matches_trait() {
        let system = make_system(&RollParams::default()).expect("system");
        let state = RollState::new(3.0, 1.5, 0.03);
        let a = slope_func(&state, 0.0, &system);
        let b = slope_func(&state, 99.0, &system);
        assert_eq!(a, b);

        let mut out = [0.0; 3];
        DynamicalSystem::<f64>::apply(&system, 7.0, &state.to_array(), &mut out);
        assert_eq!(out, a);
    }

    #[test]
    fn event_is_negative_until_length_reached() {
        let system = make_system(&RollParams::default()).expect("system");
        assert_eq!(event_func(&system.init, 0.0, &system), -47.0);
        let done = RollState::new(0.0, 47.0, 0.055);
        assert_eq!(event_func(&done, 0.0, &system), 0.0);
        assert_eq!(system.eval(0.0, &[0.0, 50.0, 0.06]), 3.0);
        assert_eq!(system.direction(), CrossingDirection::Rising);
    }
}
