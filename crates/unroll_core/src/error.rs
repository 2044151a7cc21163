//! Error types for the unrolling simulation.

use crate::trajectory::Trajectory;
use crate::units::Dimension;
use thiserror::Error;

/// Errors surfaced by parameter validation and integration.
///
/// Reaching the time horizon without the paper running out is not an error;
/// it is reported through [`crate::trajectory::Termination::TimeLimit`].
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Non-physical geometry, non-positive horizon or invalid solver settings.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// A quantity was supplied in a unit of the wrong dimension.
    #[error("Unit mismatch: expected {expected}, found {found}")]
    UnitMismatch { expected: Dimension, found: Dimension },

    /// A quantity string could not be read.
    #[error("Could not parse quantity: {0}")]
    UnitParse(String),

    /// The driver could not complete a step. Carries everything integrated so far.
    #[error("Numerical failure at t = {t}: {reason}", t = .partial.final_time())]
    NumericalFailure {
        reason: String,
        partial: Box<Trajectory>,
    },
}

impl SimulationError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    /// True for errors raised before integration starts.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, SimulationError::NumericalFailure { .. })
    }
}
