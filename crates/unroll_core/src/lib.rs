//! The `unroll_core` crate models a roll of paper unrolling at constant
//! angular velocity as a three-variable ODE, integrated until the paper runs out.
//!
//! Key components:
//! - **Units**: `Quantity`, a value tagged with a unit and checked for dimension at runtime.
//! - **Params**: `RollParams` (caller input), `estimate_k`, and `RollSystem` (SI record).
//! - **Model**: `slope_func` and `event_func`, also exposed as `DynamicalSystem`/`EventFunction`.
//! - **Solvers**: RK4 (step doubling) and Tsit5 (embedded error) behind `AdaptiveStepper`.
//! - **Integrator**: adaptive driver with Hermite dense output and bisection event refinement.
//! - **Trajectory**: samples, columns, interpolation, `Summary`, and CSV/JSON export.
pub mod error;
pub mod export;
pub mod integrator;
pub mod model;
pub mod params;
pub mod simulation;
pub mod solvers;
pub mod summary;
pub mod traits;
pub mod trajectory;
pub mod units;

pub use error::SimulationError;
pub use integrator::SolverSettings;
pub use params::{estimate_k, make_system, RollParams, RollState, RollSystem};
pub use simulation::simulate;
pub use summary::Summary;
pub use trajectory::{Termination, Trajectory};
pub use units::{Dimension, Quantity, Unit};
