use crate::trajectory::{Termination, Trajectory};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Scalar results of a run, read off the last sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Elapsed simulated time (s).
    pub final_time: f64,
    /// Total rotation (rad).
    pub final_theta: f64,
    pub revolutions: f64,
    /// Paper unrolled (m).
    pub final_y: f64,
    /// Radius at the end (m).
    pub final_r: f64,
    pub termination: Termination,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
}

impl Summary {
    /// Returns `None` when the trajectory has no roll-shaped samples.
    pub fn from_trajectory(trajectory: &Trajectory) -> Option<Self> {
        let state = trajectory.last_roll_state()?;
        Some(Self {
            final_time: trajectory.final_time(),
            final_theta: state.theta,
            revolutions: state.theta / (2.0 * PI),
            final_y: state.y,
            final_r: state.r,
            termination: trajectory.termination.clone(),
            accepted_steps: trajectory.stats.accepted_steps,
            rejected_steps: trajectory.stats.rejected_steps,
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match &self.termination {
            Termination::Event => "paper fully unrolled".to_string(),
            Termination::TimeLimit => "time limit reached before the paper ran out".to_string(),
            Termination::Failed { reason } => format!("failed: {reason}"),
        };
        writeln!(f, "Outcome:       {outcome}")?;
        writeln!(f, "Elapsed time:  {:.4} s", self.final_time)?;
        writeln!(f, "Unrolled:      {:.4} m", self.final_y)?;
        writeln!(f, "Final radius:  {:.5} m", self.final_r)?;
        writeln!(
            f,
            "Rotation:      {:.2} rad ({:.2} rev)",
            self.final_theta, self.revolutions
        )?;
        write!(
            f,
            "Steps:         {} accepted, {} rejected",
            self.accepted_steps, self.rejected_steps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::SolverSettings;
    use crate::params::RollParams;
    use crate::simulation::simulate;

    #[test]
    fn summary_reports_canonical_results() {
        let trajectory =
            simulate(&RollParams::default(), &SolverSettings::default()).expect("simulate");
        let summary = Summary::from_trajectory(&trajectory).expect("summary");
        assert_eq!(summary.termination, Termination::Event);
        assert!((summary.final_y - 47.0).abs() < 1e-2);
        assert!((summary.final_r - 0.055).abs() < 1e-4);
        assert!((summary.revolutions - summary.final_theta / (2.0 * PI)).abs() < 1e-12);
        assert!(summary.final_time < 130.0);

        let text = summary.to_string();
        assert!(text.contains("paper fully unrolled"));
        assert!(text.contains("rev"));
    }
}
