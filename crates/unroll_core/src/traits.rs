use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in the model and solvers.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Represents a system of first-order ODEs.
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// x: current state
    /// t: current time
    /// out: buffer to write dx/dt
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// A stepper that reports a local error estimate alongside each trial step.
///
/// Trial steps leave the caller's state untouched, so the driver can reject
/// them and retry with a smaller step.
pub trait AdaptiveStepper<T: Scalar> {
    /// Attempts one step of size dt from (t, state).
    /// next: proposed state at t + dt
    /// error: per-component local error estimate
    fn try_step(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: T,
        state: &[T],
        dt: T,
        next: &mut [T],
        error: &mut [T],
    );

    /// Number of derivative evaluations performed per trial step.
    fn evaluations_per_step(&self) -> usize;
}

/// Direction of a zero crossing that an event function reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossingDirection {
    /// Negative to positive.
    #[default]
    Rising,
    /// Positive to negative.
    Falling,
    Either,
}

impl CrossingDirection {
    /// Returns true when the step from `before` to `after` crosses zero in this direction.
    pub fn crossed(self, before: f64, after: f64) -> bool {
        match self {
            CrossingDirection::Rising => before < 0.0 && after >= 0.0,
            CrossingDirection::Falling => before > 0.0 && after <= 0.0,
            CrossingDirection::Either => {
                (before < 0.0 && after >= 0.0) || (before > 0.0 && after <= 0.0)
            }
        }
    }
}

/// A scalar function of (t, state) whose zero crossing terminates integration.
pub trait EventFunction {
    fn eval(&self, t: f64, x: &[f64]) -> f64;

    fn direction(&self) -> CrossingDirection {
        CrossingDirection::Rising
    }
}
