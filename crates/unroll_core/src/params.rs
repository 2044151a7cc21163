//! Parameter record, derived constant and system record for a paper roll.

use crate::error::SimulationError;
use crate::units::{Dimension, Quantity};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Angular velocity of the canonical scenario, in rad/s.
pub const DEFAULT_OMEGA: f64 = 10.0;

fn default_omega() -> Quantity {
    Quantity::radians_per_second(DEFAULT_OMEGA)
}

/// Physical description of the roll, as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollParams {
    /// Radius of the empty core.
    pub r_min: Quantity,
    /// Radius of the full roll.
    pub r_max: Quantity,
    /// Total length of paper on the roll.
    pub length: Quantity,
    /// Upper bound on simulated time.
    pub t_end: Quantity,
    /// Constant angular velocity of the roll.
    #[serde(default = "default_omega")]
    pub omega: Quantity,
}

impl Default for RollParams {
    fn default() -> Self {
        Self {
            r_min: Quantity::meters(0.02),
            r_max: Quantity::meters(0.055),
            length: Quantity::meters(47.0),
            t_end: Quantity::seconds(130.0),
            omega: default_omega(),
        }
    }
}

impl RollParams {
    pub fn new(
        r_min: Quantity,
        r_max: Quantity,
        length: Quantity,
        t_end: Quantity,
    ) -> Result<Self, SimulationError> {
        let params = Self {
            r_min,
            r_max,
            length,
            t_end,
            omega: default_omega(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_omega(mut self, omega: Quantity) -> Result<Self, SimulationError> {
        self.omega = omega;
        self.validate()?;
        Ok(self)
    }

    /// Checks units first, then positivity and geometry.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let (r_min, r_max, length) = self.geometry()?;
        let t_end = self.t_end.si_value_as(Dimension::Time)?;
        let omega = self.omega.si_value_as(Dimension::AngularVelocity)?;

        check_geometry(r_min, r_max, length)?;
        if !t_end.is_finite() || t_end <= 0.0 {
            return Err(SimulationError::invalid(format!(
                "t_end must be positive and finite (got {})",
                self.t_end
            )));
        }
        if !omega.is_finite() || omega <= 0.0 {
            return Err(SimulationError::invalid(format!(
                "omega must be positive and finite (got {})",
                self.omega
            )));
        }
        Ok(())
    }

    /// (r_min, r_max, length) in meters, unit-checked but not range-checked.
    fn geometry(&self) -> Result<(f64, f64, f64), SimulationError> {
        Ok((
            self.r_min.si_value_as(Dimension::Length)?,
            self.r_max.si_value_as(Dimension::Length)?,
            self.length.si_value_as(Dimension::Length)?,
        ))
    }
}

fn check_geometry(r_min: f64, r_max: f64, length: f64) -> Result<(), SimulationError> {
    if !(r_min.is_finite() && r_max.is_finite() && length.is_finite()) {
        return Err(SimulationError::invalid("roll dimensions must be finite"));
    }
    if r_min <= 0.0 {
        return Err(SimulationError::invalid(format!(
            "r_min must be positive (got {r_min} m)"
        )));
    }
    if r_max <= r_min {
        return Err(SimulationError::invalid(format!(
            "r_max ({r_max} m) must exceed r_min ({r_min} m)"
        )));
    }
    if length <= 0.0 {
        return Err(SimulationError::invalid(format!(
            "length must be positive (got {length} m)"
        )));
    }
    Ok(())
}

/// Average radial growth per radian of winding, in meters per radian.
///
/// Treats the roll as a spiral with constant average circumference:
/// the number of turns is the length over the mean circumference, and the
/// radius grows from `r_min` to `r_max` over that many turns.
pub fn estimate_k(params: &RollParams) -> Result<f64, SimulationError> {
    let (r_min, r_max, length) = params.geometry()?;
    check_geometry(r_min, r_max, length)?;

    let r_avg = (r_max + r_min) / 2.0;
    let c_avg = 2.0 * PI * r_avg;
    let revs = length / c_avg;
    let rads = 2.0 * PI * revs;
    Ok((r_max - r_min) / rads)
}

/// State of the roll: (theta, y, r) in (rad, m, m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollState {
    /// Cumulative rotation angle.
    pub theta: f64,
    /// Cumulative unrolled length.
    pub y: f64,
    /// Current roll radius.
    pub r: f64,
}

impl RollState {
    pub const DIM: usize = 3;

    pub fn new(theta: f64, y: f64, r: f64) -> Self {
        Self { theta, y, r }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.theta, self.y, self.r]
    }

    /// Reads the first three components of a solver state.
    pub fn from_slice(x: &[f64]) -> Self {
        Self::new(x[0], x[1], x[2])
    }
}

/// Everything the model and driver need, in SI units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollSystem {
    pub init: RollState,
    /// Radius growth per radian (m/rad).
    pub k: f64,
    /// Time horizon (s).
    pub t_end: f64,
    /// Paper length that terminates the run (m).
    pub length: f64,
    /// Angular velocity (rad/s).
    pub omega: f64,
}

/// Builds the system record: starts at theta = y = 0 with the core radius.
pub fn make_system(params: &RollParams) -> Result<RollSystem, SimulationError> {
    params.validate()?;
    let k = estimate_k(params)?;
    Ok(RollSystem {
        init: RollState::new(0.0, 0.0, params.r_min.si_value()),
        k,
        t_end: params.t_end.si_value(),
        length: params.length.si_value(),
        omega: params.omega.si_value(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;

    fn canonical() -> RollParams {
        RollParams::default()
    }

    #[test]
    fn estimate_k_matches_closed_form() {
        let k = estimate_k(&canonical()).expect("k");
        // rads = L / r_avg = 47 / 0.0375
        let expected = 0.035 / (47.0 / 0.0375);
        assert!((k - expected).abs() < 1e-15);
        assert!(k > 0.0);
    }

    #[test]
    fn estimate_k_scales_linearly_with_radius_span() {
        let base = RollParams {
            r_min: Quantity::meters(0.03),
            r_max: Quantity::meters(0.05),
            ..canonical()
        };
        let wider = RollParams {
            r_min: Quantity::meters(0.02),
            r_max: Quantity::meters(0.06),
            ..canonical()
        };
        let k_base = estimate_k(&base).expect("k");
        let k_wider = estimate_k(&wider).expect("k");
        assert!((k_wider / k_base - 2.0).abs() < 1e-12);
    }

    #[test]
    fn estimate_k_rejects_inverted_or_degenerate_geometry() {
        let inverted = RollParams {
            r_min: Quantity::meters(0.055),
            r_max: Quantity::meters(0.02),
            ..canonical()
        };
        assert!(matches!(
            estimate_k(&inverted),
            Err(SimulationError::InvalidParameters(_))
        ));

        let flat = RollParams {
            r_max: Quantity::meters(0.02),
            ..canonical()
        };
        assert!(matches!(
            estimate_k(&flat),
            Err(SimulationError::InvalidParameters(_))
        ));

        let empty = RollParams {
            length: Quantity::meters(0.0),
            ..canonical()
        };
        assert!(matches!(
            estimate_k(&empty),
            Err(SimulationError::InvalidParameters(_))
        ));
    }

    #[test]
    fn estimate_k_converts_units() {
        let mixed = RollParams {
            r_min: Quantity::new(2.0, Unit::Centimeter),
            r_max: Quantity::new(55.0, Unit::Millimeter),
            length: Quantity::new(0.047, Unit::Kilometer),
            ..canonical()
        };
        let k_mixed = estimate_k(&mixed).expect("k");
        let k_si = estimate_k(&canonical()).expect("k");
        assert!((k_mixed - k_si).abs() < 1e-15);
    }

    #[test]
    fn validation_rejects_mismatched_units() {
        let err = RollParams::new(
            Quantity::meters(0.02),
            Quantity::meters(0.055),
            Quantity::seconds(47.0),
            Quantity::seconds(130.0),
        )
        .expect_err("length given as time");
        assert!(matches!(
            err,
            SimulationError::UnitMismatch {
                expected: Dimension::Length,
                found: Dimension::Time
            }
        ));

        let err = RollParams::new(
            Quantity::meters(0.02),
            Quantity::meters(0.055),
            Quantity::meters(47.0),
            Quantity::meters(130.0),
        )
        .expect_err("t_end given as length");
        assert!(matches!(err, SimulationError::UnitMismatch { .. }));
        assert!(err.is_input_error());
    }

    #[test]
    fn validation_rejects_non_positive_horizon_and_omega() {
        let params = canonical();
        assert!(RollParams {
            t_end: Quantity::seconds(0.0),
            ..params
        }
        .validate()
        .is_err());
        assert!(params
            .with_omega(Quantity::radians_per_second(-1.0))
            .is_err());
        assert!(params.with_omega(Quantity::meters(1.0)).is_err());
    }

    #[test]
    fn make_system_starts_at_core_radius() {
        let params = canonical();
        let system = make_system(&params).expect("system");
        assert_eq!(system.init, RollState::new(0.0, 0.0, 0.02));
        assert_eq!(system.t_end, 130.0);
        assert_eq!(system.length, 47.0);
        assert_eq!(system.omega, DEFAULT_OMEGA);
        assert_eq!(system.k, estimate_k(&params).expect("k"));
    }

    #[test]
    fn make_system_converts_to_si() {
        let params = RollParams::new(
            Quantity::new(20.0, Unit::Millimeter),
            Quantity::new(5.5, Unit::Centimeter),
            Quantity::meters(47.0),
            Quantity::new(2.0, Unit::Minute),
        )
        .and_then(|p| p.with_omega(Quantity::new(60.0, Unit::RevolutionPerMinute)))
        .expect("params");
        let system = make_system(&params).expect("system");
        assert!((system.init.r - 0.02).abs() < 1e-15);
        assert_eq!(system.t_end, 120.0);
        assert!((system.omega - 2.0 * PI).abs() < 1e-12);
    }

    #[test]
    fn params_deserialize_from_unit_strings() {
        let json = r#"{"r_min": "2 cm", "r_max": "0.055 m", "length": "47 m", "t_end": "130 s"}"#;
        let params: RollParams = serde_json::from_str(json).expect("params");
        assert_eq!(params.omega, Quantity::radians_per_second(DEFAULT_OMEGA));
        assert!(params.validate().is_ok());
    }
}
