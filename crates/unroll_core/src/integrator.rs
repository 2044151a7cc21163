//! Adaptive integration driver with event termination.
//!
//! The driver advances any [`DynamicalSystem`] with an [`AdaptiveStepper`],
//! accepting a trial step when its scaled RMS error is at most one. After
//! each accepted step the [`EventFunction`] is checked for a crossing; a
//! crossing is refined by bisection on the cubic Hermite interpolant of the
//! step, so the reported event time does not depend on where steps landed.

use crate::error::SimulationError;
use crate::solvers::StepperKind;
use crate::traits::{AdaptiveStepper, DynamicalSystem, EventFunction};
use crate::trajectory::{hermite, Termination, Trajectory, TrajectoryPoint};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;
/// 1 / (order + 1) for a 4th order error estimate.
const EXPONENT: f64 = 0.2;
const MAX_BISECTIONS: usize = 200;

/// Settings controlling the adaptive driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverSettings {
    pub stepper: StepperKind,
    /// Upper bound on the step size. `None` allows steps up to the whole horizon.
    pub max_step: Option<f64>,
    /// First trial step. `None` uses 1% of the horizon.
    pub initial_step: Option<f64>,
    pub min_step: f64,
    pub rtol: f64,
    pub atol: f64,
    /// Width of the final bisection bracket around an event, in time units.
    pub event_tolerance: f64,
    /// Maximum number of trial steps, accepted or rejected.
    pub max_steps: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            stepper: StepperKind::default(),
            max_step: None,
            initial_step: None,
            min_step: 1e-12,
            rtol: 1e-6,
            atol: 1e-9,
            event_tolerance: 1e-9,
            max_steps: 100_000,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<(), SimulationError> {
        fn positive(name: &str, value: f64) -> Result<(), SimulationError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SimulationError::invalid(format!(
                    "{name} must be positive and finite (got {value})"
                )))
            }
        }

        if let Some(max_step) = self.max_step {
            // An infinite cap is allowed and means "no cap".
            if max_step.is_nan() || max_step <= 0.0 {
                return Err(SimulationError::invalid(format!(
                    "max_step must be positive (got {max_step})"
                )));
            }
        }
        if let Some(initial) = self.initial_step {
            positive("initial_step", initial)?;
        }
        positive("min_step", self.min_step)?;
        positive("atol", self.atol)?;
        positive("event_tolerance", self.event_tolerance)?;
        if !self.rtol.is_finite() || self.rtol < 0.0 {
            return Err(SimulationError::invalid(format!(
                "rtol must be non-negative and finite (got {})",
                self.rtol
            )));
        }
        if self.max_steps == 0 {
            return Err(SimulationError::invalid("max_steps must be at least 1"));
        }
        if let Some(max_step) = self.max_step {
            if max_step < self.min_step {
                return Err(SimulationError::invalid(format!(
                    "max_step ({max_step}) is below min_step ({})",
                    self.min_step
                )));
            }
        }
        Ok(())
    }
}

/// Driver states. `Running` is the only non-terminal one.
#[derive(Debug, Clone, PartialEq)]
enum DriverStatus {
    Running,
    EventTerminated,
    TimeLimitReached,
    Failed(String),
}

/// Integrates from (t0, init) until the event fires, `t_end` is reached, or a step fails.
///
/// Never panics on numerical trouble; failures are reported through
/// [`Termination::Failed`] with every sample accepted before the failure.
#[allow(clippy::too_many_arguments)]
pub fn integrate<S, E, A>(
    system: &S,
    event: &E,
    stepper: &mut A,
    t0: f64,
    init: &[f64],
    t_end: f64,
    settings: &SolverSettings,
    variables: Vec<String>,
) -> Trajectory
where
    S: DynamicalSystem<f64>,
    E: EventFunction,
    A: AdaptiveStepper<f64>,
{
    let dim = init.len();
    let mut trajectory = Trajectory::new(variables);
    let direction = event.direction();
    if system.dimension() != dim {
        trajectory.termination = Termination::Failed {
            reason: format!(
                "initial state has {dim} components, system expects {}",
                system.dimension()
            ),
        };
        warn!(expected = system.dimension(), found = dim, "state dimension mismatch");
        return trajectory;
    }

    let horizon = t_end - t0;
    let max_step = settings.max_step.unwrap_or(f64::INFINITY);
    let mut h = settings
        .initial_step
        .unwrap_or(0.01 * horizon)
        .min(max_step)
        .max(settings.min_step);

    let mut t = t0;
    let mut state = init.to_vec();
    let mut deriv = vec![0.0; dim];
    system.apply(t, &state, &mut deriv);
    trajectory.stats.evaluations += 1;
    trajectory.points.push(TrajectoryPoint {
        t,
        state: state.clone(),
        derivative: deriv.clone(),
    });

    let mut status = if horizon.is_nan() || horizon <= 0.0 {
        DriverStatus::Failed(format!("t_end ({t_end}) must be after t0 ({t0})"))
    } else if !all_finite(&state) || !all_finite(&deriv) {
        DriverStatus::Failed(format!("non-finite initial state or derivative at t = {t}"))
    } else {
        DriverStatus::Running
    };

    let mut g_prev = event.eval(t, &state);
    let mut next = vec![0.0; dim];
    let mut next_deriv = vec![0.0; dim];
    let mut error = vec![0.0; dim];
    let mut attempts = 0usize;

    while status == DriverStatus::Running {
        let remaining = t_end - t;
        if remaining <= settings.min_step {
            status = DriverStatus::TimeLimitReached;
            break;
        }
        if attempts >= settings.max_steps {
            status = DriverStatus::Failed(format!(
                "maximum number of steps ({}) exceeded",
                settings.max_steps
            ));
            break;
        }
        attempts += 1;

        let last_step = h >= remaining;
        let dt = if last_step { remaining } else { h };

        stepper.try_step(system, t, &state, dt, &mut next, &mut error);
        trajectory.stats.evaluations += stepper.evaluations_per_step();

        let err_norm = error_norm(&error, &state, &next, settings.atol, settings.rtol);
        if !err_norm.is_finite() || !all_finite(&next) {
            trajectory.stats.rejected_steps += 1;
            if dt <= settings.min_step {
                status = DriverStatus::Failed(format!("non-finite state near t = {t}"));
            } else {
                debug!(t, dt, "non-finite trial step, shrinking");
                h = (dt * MIN_FACTOR).max(settings.min_step);
            }
            continue;
        }

        if err_norm > 1.0 {
            trajectory.stats.rejected_steps += 1;
            let shrunk = dt * step_factor(err_norm);
            if shrunk < settings.min_step {
                status = DriverStatus::Failed(format!(
                    "step size {shrunk:e} fell below min_step at t = {t}"
                ));
            } else {
                debug!(t, dt, err_norm, "rejected step");
                h = shrunk;
            }
            continue;
        }

        let t_new = if last_step { t_end } else { t + dt };
        system.apply(t_new, &next, &mut next_deriv);
        trajectory.stats.evaluations += 1;
        if !all_finite(&next_deriv) {
            status = DriverStatus::Failed(format!("non-finite derivative at t = {t_new}"));
            break;
        }
        trajectory.stats.accepted_steps += 1;

        let g_new = event.eval(t_new, &next);
        if direction.crossed(g_prev, g_new) {
            let (t_event, state_event) = refine_event(
                event,
                (t, &state, &deriv, g_prev),
                (t_new, &next, &next_deriv),
                settings.event_tolerance,
            );
            let mut deriv_event = vec![0.0; dim];
            system.apply(t_event, &state_event, &mut deriv_event);
            trajectory.stats.evaluations += 1;
            debug!(t_event, step_end = t_new, "event refined");
            trajectory.points.push(TrajectoryPoint {
                t: t_event,
                state: state_event,
                derivative: deriv_event,
            });
            trajectory.event_time = Some(t_event);
            status = DriverStatus::EventTerminated;
            break;
        }

        t = t_new;
        std::mem::swap(&mut state, &mut next);
        std::mem::swap(&mut deriv, &mut next_deriv);
        g_prev = g_new;
        trajectory.points.push(TrajectoryPoint {
            t,
            state: state.clone(),
            derivative: deriv.clone(),
        });

        h = (dt * step_factor(err_norm)).min(max_step);
    }

    trajectory.termination = match status {
        DriverStatus::EventTerminated => Termination::Event,
        DriverStatus::TimeLimitReached => Termination::TimeLimit,
        DriverStatus::Failed(reason) => {
            warn!(%reason, t = trajectory.final_time(), "integration failed");
            Termination::Failed { reason }
        }
        DriverStatus::Running => unreachable!("driver loop exits only on a terminal state"),
    };
    info!(
        termination = ?trajectory.termination,
        accepted = trajectory.stats.accepted_steps,
        rejected = trajectory.stats.rejected_steps,
        final_time = trajectory.final_time(),
        "integration finished"
    );
    trajectory
}

/// Runs [`integrate`] with a freshly built stepper of the configured kind.
#[allow(clippy::too_many_arguments)]
pub fn integrate_with<S, E>(
    system: &S,
    event: &E,
    t0: f64,
    init: &[f64],
    t_end: f64,
    settings: &SolverSettings,
    variables: Vec<String>,
) -> Trajectory
where
    S: DynamicalSystem<f64>,
    E: EventFunction,
{
    let dim = init.len();
    match settings.stepper {
        StepperKind::Rk4 => {
            let mut stepper = crate::solvers::RK4::new(dim);
            integrate(system, event, &mut stepper, t0, init, t_end, settings, variables)
        }
        StepperKind::Tsit5 => {
            let mut stepper = crate::solvers::Tsit5::new(dim);
            integrate(system, event, &mut stepper, t0, init, t_end, settings, variables)
        }
    }
}

/// Bisects the Hermite interpolant of one step until the bracket is narrower
/// than `tolerance`. Returns the right end of the bracket, where the event
/// has already crossed.
fn refine_event<E: EventFunction>(
    event: &E,
    start: (f64, &[f64], &[f64], f64),
    end: (f64, &[f64], &[f64]),
    tolerance: f64,
) -> (f64, Vec<f64>) {
    let (t_a, y_a, f_a, g_a) = start;
    let (t_b, y_b, f_b) = end;
    let direction = event.direction();

    let mut lo = t_a;
    let mut g_lo = g_a;
    let mut hi = t_b;
    let mut state = y_b.to_vec();
    let mut probe = vec![0.0; y_a.len()];

    let mut iterations = 0;
    while hi - lo > tolerance && iterations < MAX_BISECTIONS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        hermite(t_a, y_a, f_a, t_b, y_b, f_b, mid, &mut probe);
        let g_mid = event.eval(mid, &probe);
        if direction.crossed(g_lo, g_mid) {
            hi = mid;
            state.copy_from_slice(&probe);
        } else {
            lo = mid;
            g_lo = g_mid;
        }
        iterations += 1;
    }
    (hi, state)
}

fn error_norm(error: &[f64], state: &[f64], next: &[f64], atol: f64, rtol: f64) -> f64 {
    if error.is_empty() {
        return 0.0;
    }
    let sum: f64 = error
        .iter()
        .zip(state.iter().zip(next))
        .map(|(e, (y0, y1))| {
            let scale = atol + rtol * y0.abs().max(y1.abs());
            (e / scale).powi(2)
        })
        .sum();
    (sum / error.len() as f64).sqrt()
}

fn step_factor(err_norm: f64) -> f64 {
    if err_norm == 0.0 {
        return MAX_FACTOR;
    }
    (SAFETY * err_norm.powf(-EXPONENT)).clamp(MIN_FACTOR, MAX_FACTOR)
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}
