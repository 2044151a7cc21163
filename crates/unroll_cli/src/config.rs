//! Scenario files and flag merging.

use crate::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use unroll_core::integrator::SolverSettings;
use unroll_core::params::RollParams;
use unroll_core::units::Quantity;

/// Parameter section of a scenario file; missing entries fall back to the canonical roll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamsSection {
    pub r_min: Option<Quantity>,
    pub r_max: Option<Quantity>,
    pub length: Option<Quantity>,
    pub t_end: Option<Quantity>,
    pub omega: Option<Quantity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    #[serde(default)]
    pub params: ParamsSection,
    #[serde(default)]
    pub solver: SolverSettings,
}

impl ScenarioFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Fully resolved inputs. Validation is left to the simulation entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub params: RollParams,
    pub settings: SolverSettings,
}

impl RunConfig {
    pub fn resolve(file: ScenarioFile, args: &Args) -> Self {
        let defaults = RollParams::default();
        let section = file.params;
        let params = RollParams {
            r_min: args.r_min.or(section.r_min).unwrap_or(defaults.r_min),
            r_max: args.r_max.or(section.r_max).unwrap_or(defaults.r_max),
            length: args.length.or(section.length).unwrap_or(defaults.length),
            t_end: args.t_end.or(section.t_end).unwrap_or(defaults.t_end),
            omega: args.omega.or(section.omega).unwrap_or(defaults.omega),
        };

        let mut settings = file.solver;
        if let Some(stepper) = args.stepper {
            settings.stepper = stepper;
        }
        if args.max_step.is_some() {
            settings.max_step = args.max_step;
        }
        if let Some(rtol) = args.rtol {
            settings.rtol = rtol;
        }
        if let Some(atol) = args.atol {
            settings.atol = atol;
        }

        Self { params, settings }
    }
}
