//! Integration output: accepted samples plus run metadata.

use crate::params::RollState;
use serde::{Deserialize, Serialize};

/// How an integration run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The event function crossed zero and the crossing was refined.
    Event,
    /// The time horizon was reached without the event firing.
    TimeLimit,
    /// A step could not be completed.
    Failed { reason: String },
}

/// One accepted sample: time, state and the derivative at that state.
///
/// Keeping the derivative makes the trajectory a piecewise cubic Hermite
/// dense output without re-evaluating the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub t: f64,
    pub state: Vec<f64>,
    pub derivative: Vec<f64>,
}

/// A time and interpolated state, as produced by [`Trajectory::resample`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    pub state: Vec<f64>,
}

/// Counters collected by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub evaluations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Names of the state components, in order.
    pub variables: Vec<String>,
    pub points: Vec<TrajectoryPoint>,
    pub termination: Termination,
    pub stats: IntegrationStats,
    /// Refined event time, when the event fired.
    pub event_time: Option<f64>,
}

impl Trajectory {
    pub(crate) fn new(variables: Vec<String>) -> Self {
        Self {
            variables,
            points: Vec::new(),
            termination: Termination::TimeLimit,
            stats: IntegrationStats::default(),
            event_time: None,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn succeeded(&self) -> bool {
        !matches!(self.termination, Termination::Failed { .. })
    }

    pub fn event_fired(&self) -> bool {
        matches!(self.termination, Termination::Event)
    }

    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }

    /// Time of the last sample, or 0 for an empty trajectory.
    pub fn final_time(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.t)
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.t).collect()
    }

    pub fn column(&self, index: usize) -> Vec<f64> {
        self.points.iter().map(|p| p.state[index]).collect()
    }

    pub fn column_by_name(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.variables.iter().position(|v| v == name)?;
        Some(self.column(index))
    }

    pub fn theta(&self) -> Vec<f64> {
        self.column(0)
    }

    pub fn y(&self) -> Vec<f64> {
        self.column(1)
    }

    pub fn r(&self) -> Vec<f64> {
        self.column(2)
    }

    pub fn last_roll_state(&self) -> Option<RollState> {
        self.points
            .last()
            .filter(|p| p.state.len() >= RollState::DIM)
            .map(|p| RollState::from_slice(&p.state))
    }

    /// Dense output at `t`, interpolating between the bracketing samples.
    /// Returns `None` outside the integrated interval.
    pub fn sample_at(&self, t: f64) -> Option<Vec<f64>> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if t < first.t || t > last.t {
            return None;
        }
        // First index whose time is >= t.
        let upper = self.points.partition_point(|p| p.t < t);
        if upper == 0 {
            return Some(first.state.clone());
        }
        let a = &self.points[upper - 1];
        let b = &self.points[upper];
        if b.t == t {
            return Some(b.state.clone());
        }
        let mut out = vec![0.0; a.state.len()];
        hermite(
            a.t,
            &a.state,
            &a.derivative,
            b.t,
            &b.state,
            &b.derivative,
            t,
            &mut out,
        );
        Some(out)
    }

    /// `count` evenly spaced samples over the integrated interval, endpoints included.
    pub fn resample(&self, count: usize) -> Vec<Sample> {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return Vec::new();
        };
        if count == 0 {
            return Vec::new();
        }
        if count == 1 || first.t == last.t {
            return vec![Sample {
                t: last.t,
                state: last.state.clone(),
            }];
        }
        let span = last.t - first.t;
        (0..count)
            .filter_map(|i| {
                let t = if i + 1 == count {
                    last.t
                } else {
                    first.t + span * i as f64 / (count - 1) as f64
                };
                self.sample_at(t).map(|state| Sample { t, state })
            })
            .collect()
    }
}

/// Cubic Hermite interpolation on [t0, t1] from endpoint values and slopes.
#[allow(clippy::too_many_arguments)]
pub(crate) fn hermite(
    t0: f64,
    y0: &[f64],
    f0: &[f64],
    t1: f64,
    y1: &[f64],
    f1: &[f64],
    t: f64,
    out: &mut [f64],
) {
    let dt = t1 - t0;
    let s = (t - t0) / dt;
    let s2 = s * s;
    let s3 = s2 * s;
    let h00 = 1.0 - 3.0 * s2 + 2.0 * s3;
    let h10 = s - 2.0 * s2 + s3;
    let h01 = 3.0 * s2 - 2.0 * s3;
    let h11 = s3 - s2;
    for i in 0..out.len() {
        out[i] = h00 * y0[i] + h10 * dt * f0[i] + h01 * y1[i] + h11 * dt * f1[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // y = t^2 on [0, 2], sampled at 0, 1, 2.
    fn parabola() -> Trajectory {
        let mut traj = Trajectory::new(vec!["y".to_string()]);
        for t in [0.0, 1.0, 2.0] {
            traj.points.push(TrajectoryPoint {
                t,
                state: vec![t * t],
                derivative: vec![2.0 * t],
            });
        }
        traj
    }

    #[test]
    fn sample_at_reproduces_stored_samples_and_cubics() {
        let traj = parabola();
        assert_eq!(traj.sample_at(1.0), Some(vec![1.0]));
        assert_eq!(traj.sample_at(0.0), Some(vec![0.0]));
        assert_eq!(traj.sample_at(2.0), Some(vec![4.0]));
        let mid = traj.sample_at(1.5).expect("inside");
        assert!((mid[0] - 2.25).abs() < 1e-12);
        assert!(traj.sample_at(-0.1).is_none());
        assert!(traj.sample_at(2.1).is_none());
    }

    #[test]
    fn resample_spans_interval_with_endpoints() {
        let traj = parabola();
        let samples = traj.resample(5);
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0].t, 0.0);
        assert_eq!(samples[4].t, 2.0);
        assert!((samples[1].state[0] - 0.25).abs() < 1e-12);
        assert!(traj.resample(0).is_empty());
        assert_eq!(traj.resample(1).len(), 1);
    }

    #[test]
    fn columns_and_metadata_accessors() {
        let traj = parabola();
        assert_eq!(traj.times(), vec![0.0, 1.0, 2.0]);
        assert_eq!(traj.column_by_name("y"), Some(vec![0.0, 1.0, 4.0]));
        assert!(traj.column_by_name("r").is_none());
        assert_eq!(traj.final_time(), 2.0);
        assert!(traj.succeeded());
        assert!(!traj.event_fired());
        assert!(traj.last_roll_state().is_none());
    }

    #[test]
    fn empty_trajectory_is_safe_to_query() {
        let traj = Trajectory::new(Vec::new());
        assert!(traj.is_empty());
        assert_eq!(traj.final_time(), 0.0);
        assert!(traj.sample_at(0.0).is_none());
        assert!(traj.resample(10).is_empty());
    }
}
