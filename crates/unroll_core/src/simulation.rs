//! End-to-end run: parameters in, trajectory out.

use crate::error::SimulationError;
use crate::integrator::{integrate_with, SolverSettings};
use crate::params::{make_system, RollParams, RollSystem};
use crate::trajectory::{Termination, Trajectory};
use tracing::info;

/// Column names of the roll state, in solver order.
pub const ROLL_VARIABLES: [&str; 3] = ["theta", "y", "r"];

/// Integrates an already-built system from t = 0 to its horizon.
///
/// A failed run comes back as a trajectory with [`Termination::Failed`];
/// use [`simulate`] to get it as an error instead.
pub fn run_system(system: &RollSystem, settings: &SolverSettings) -> Trajectory {
    integrate_with(
        system,
        system,
        0.0,
        &system.init.to_array(),
        system.t_end,
        settings,
        ROLL_VARIABLES.iter().map(|v| v.to_string()).collect(),
    )
}

/// Validates the inputs, builds the system and integrates it.
///
/// Running out of time before the paper runs out is `Ok`, with
/// [`Termination::TimeLimit`]; a numerical failure is an error carrying the
/// partial trajectory.
pub fn simulate(
    params: &RollParams,
    settings: &SolverSettings,
) -> Result<Trajectory, SimulationError> {
    settings.validate()?;
    let system = make_system(params)?;
    info!(
        k = system.k,
        omega = system.omega,
        length = system.length,
        t_end = system.t_end,
        stepper = ?settings.stepper,
        "starting unroll simulation"
    );

    let trajectory = run_system(&system, settings);
    match &trajectory.termination {
        Termination::Failed { reason } => Err(SimulationError::NumericalFailure {
            reason: reason.clone(),
            partial: Box::new(trajectory),
        }),
        _ => Ok(trajectory),
    }
}
