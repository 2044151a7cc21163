//! WASM wrapper around a single unrolling simulation.

use unroll_core::integrator::SolverSettings;
use unroll_core::params::{make_system, RollParams, RollSystem};
use unroll_core::simulation::run_system;
use unroll_core::solvers::StepperKind;
use unroll_core::summary::Summary;
use unroll_core::trajectory::{Termination, Trajectory};
use unroll_core::units::Quantity;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmRollSimulation {
    pub(crate) system: RollSystem,
    pub(crate) settings: SolverSettings,
    pub(crate) trajectory: Option<Trajectory>,
}

/// Parses the four quantity strings into validated parameters.
pub(crate) fn build_params(
    r_min: &str,
    r_max: &str,
    length: &str,
    t_end: &str,
    omega: Option<String>,
) -> Result<RollParams, String> {
    let parse = |name: &str, text: &str| -> Result<Quantity, String> {
        text.parse::<Quantity>()
            .map_err(|err| format!("Invalid {name}: {err}"))
    };
    let params = RollParams::new(
        parse("r_min", r_min)?,
        parse("r_max", r_max)?,
        parse("length", length)?,
        parse("t_end", t_end)?,
    )
    .map_err(|err| err.to_string())?;
    match omega {
        Some(text) => params
            .with_omega(parse("omega", &text)?)
            .map_err(|err| err.to_string()),
        None => Ok(params),
    }
}

pub(crate) fn build_settings(stepper: &str, max_step: Option<f64>) -> Result<SolverSettings, String> {
    let stepper: StepperKind = stepper.parse()?;
    let settings = SolverSettings {
        stepper,
        max_step,
        ..SolverSettings::default()
    };
    settings.validate().map_err(|err| err.to_string())?;
    Ok(settings)
}

impl WasmRollSimulation {
    fn from_parts(params: &RollParams, settings: SolverSettings) -> Result<Self, String> {
        let system = make_system(params).map_err(|err| err.to_string())?;
        Ok(Self {
            system,
            settings,
            trajectory: None,
        })
    }

    fn require_trajectory(&self) -> Result<&Trajectory, JsValue> {
        self.trajectory
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Simulation has not been run"))
    }

    fn column_or_empty(&self, index: usize) -> Vec<f64> {
        self.trajectory
            .as_ref()
            .map_or_else(Vec::new, |traj| traj.column(index))
    }
}

#[wasm_bindgen]
impl WasmRollSimulation {
    /// Quantities are strings such as "0.02 m" or "130 s"; omega defaults to 10 rad/s.
    #[wasm_bindgen(constructor)]
    pub fn new(
        r_min: &str,
        r_max: &str,
        length: &str,
        t_end: &str,
        omega: Option<String>,
        stepper: &str,
        max_step: Option<f64>,
    ) -> Result<WasmRollSimulation, JsValue> {
        console_error_panic_hook::set_once();

        let params = build_params(r_min, r_max, length, t_end, omega)
            .map_err(|e| JsValue::from_str(&e))?;
        let settings = build_settings(stepper, max_step).map_err(|e| JsValue::from_str(&e))?;
        Self::from_parts(&params, settings).map_err(|e| JsValue::from_str(&e))
    }

    /// Build from serialized `RollParams` and `SolverSettings` objects.
    pub fn from_config(params_val: JsValue, settings_val: JsValue) -> Result<WasmRollSimulation, JsValue> {
        console_error_panic_hook::set_once();

        let params: RollParams = serde_wasm_bindgen::from_value(params_val)
            .map_err(|e| JsValue::from_str(&format!("Invalid parameters: {}", e)))?;
        let settings: SolverSettings = if settings_val.is_undefined() || settings_val.is_null() {
            SolverSettings::default()
        } else {
            serde_wasm_bindgen::from_value(settings_val)
                .map_err(|e| JsValue::from_str(&format!("Invalid solver settings: {}", e)))?
        };
        settings
            .validate()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Self::from_parts(&params, settings).map_err(|e| JsValue::from_str(&e))
    }

    /// Radius growth per radian (m/rad).
    pub fn k(&self) -> f64 {
        self.system.k
    }

    /// Runs the integration. Returns true when the paper ran out before t_end.
    pub fn run(&mut self) -> Result<bool, JsValue> {
        let trajectory = run_system(&self.system, &self.settings);
        let outcome = match &trajectory.termination {
            Termination::Event => Ok(true),
            Termination::TimeLimit => Ok(false),
            Termination::Failed { reason } => Err(reason.clone()),
        };
        // Keep partial results around for inspection even on failure.
        self.trajectory = Some(trajectory);
        outcome.map_err(|reason| JsValue::from_str(&format!("Integration failed: {}", reason)))
    }

    pub fn has_run(&self) -> bool {
        self.trajectory.is_some()
    }

    pub fn times(&self) -> Vec<f64> {
        self.trajectory
            .as_ref()
            .map_or_else(Vec::new, |traj| traj.times())
    }

    pub fn theta(&self) -> Vec<f64> {
        self.column_or_empty(0)
    }

    pub fn y(&self) -> Vec<f64> {
        self.column_or_empty(1)
    }

    pub fn r(&self) -> Vec<f64> {
        self.column_or_empty(2)
    }

    /// Flattened `[t, theta, y, r]` rows at `count` evenly spaced times.
    pub fn resample(&self, count: usize) -> Vec<f64> {
        let Some(traj) = self.trajectory.as_ref() else {
            return Vec::new();
        };
        traj.resample(count)
            .into_iter()
            .flat_map(|sample| std::iter::once(sample.t).chain(sample.state))
            .collect()
    }

    pub fn summary(&self) -> Result<JsValue, JsValue> {
        let traj = self.require_trajectory()?;
        let summary = Summary::from_trajectory(traj)
            .ok_or_else(|| JsValue::from_str("Trajectory is empty"))?;
        serde_wasm_bindgen::to_value(&summary)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn trajectory(&self) -> Result<JsValue, JsValue> {
        let traj = self.require_trajectory()?;
        serde_wasm_bindgen::to_value(traj)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::WasmRollSimulation;
    use serde_wasm_bindgen::{from_value, to_value};
    use unroll_core::integrator::SolverSettings;
    use unroll_core::params::RollParams;
    use unroll_core::summary::Summary;
    use wasm_bindgen::JsValue;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn constructor_rejects_bad_input() {
        let result =
            WasmRollSimulation::new("0.055 m", "0.02 m", "47 m", "130 s", None, "tsit5", None);
        let message = result
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("r_max"), "got {message}");
        assert!(
            WasmRollSimulation::new("0.02 m", "0.055 m", "47 m", "130 s", None, "nope", None)
                .is_err()
        );
    }

    #[wasm_bindgen_test]
    fn summary_requires_a_run() {
        let sim = WasmRollSimulation::new("0.02 m", "0.055 m", "47 m", "130 s", None, "tsit5", None)
            .expect("simulation should build");
        assert!(sim.summary().is_err());
    }

    #[wasm_bindgen_test]
    fn from_config_round_trips_summary() {
        let params = to_value(&RollParams::default()).expect("params");
        let settings = to_value(&SolverSettings::default()).expect("settings");
        let mut sim = WasmRollSimulation::from_config(params, settings).expect("build");
        assert!(sim.run().expect("run"));
        let summary: Summary = from_value(sim.summary().expect("summary")).expect("decode");
        assert!((summary.final_y - 47.0).abs() < 1e-6);

        let defaulted = WasmRollSimulation::from_config(
            to_value(&RollParams::default()).expect("params"),
            JsValue::UNDEFINED,
        );
        assert!(defaulted.is_ok());
    }
}
