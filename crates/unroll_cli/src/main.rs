//! Paper roll unrolling simulator CLI
//!
//! Runs one simulation from unit-tagged flags or a JSON config file, prints a
//! summary and optionally exports the trajectory table.

mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config::{RunConfig, ScenarioFile};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use unroll_core::export::export_trajectory;
use unroll_core::simulation::simulate;
use unroll_core::solvers::StepperKind;
use unroll_core::summary::Summary;
use unroll_core::trajectory::Trajectory;
use unroll_core::units::Quantity;
use unroll_core::SimulationError;

#[derive(Parser, Debug)]
#[command(name = "unroll-sim")]
#[command(about = "Simulate a roll of paper unrolling at constant angular velocity", long_about = None)]
pub(crate) struct Args {
    /// JSON file with `params` and `solver` sections; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Core radius, e.g. "0.02 m"
    #[arg(long)]
    r_min: Option<Quantity>,

    /// Full roll radius, e.g. "5.5 cm"
    #[arg(long)]
    r_max: Option<Quantity>,

    /// Paper length, e.g. "47 m"
    #[arg(short = 'L', long)]
    length: Option<Quantity>,

    /// Time horizon, e.g. "130 s"
    #[arg(short, long)]
    t_end: Option<Quantity>,

    /// Angular velocity, e.g. "10 rad/s" or "95 rpm"
    #[arg(short, long)]
    omega: Option<Quantity>,

    /// Stepper (rk4, tsit5)
    #[arg(short, long)]
    stepper: Option<StepperKind>,

    /// Maximum step size in seconds
    #[arg(long)]
    max_step: Option<f64>,

    /// Relative tolerance
    #[arg(long)]
    rtol: Option<f64>,

    /// Absolute tolerance
    #[arg(long)]
    atol: Option<f64>,

    /// Export the trajectory to a .csv or .json file
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Resample the export to this many evenly spaced rows
    #[arg(long)]
    samples: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON summary on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --verbose.
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let file = match &args.config {
        Some(path) => ScenarioFile::load(path)?,
        None => ScenarioFile::default(),
    };
    let run = RunConfig::resolve(file, &args);

    info!(
        r_min = %run.params.r_min,
        r_max = %run.params.r_max,
        length = %run.params.length,
        t_end = %run.params.t_end,
        omega = %run.params.omega,
        "Paper roll simulation"
    );

    let trajectory = execute(&run, args.export.as_deref(), args.samples)?;

    let summary = Summary::from_trajectory(&trajectory)
        .context("Simulation produced an empty trajectory")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }

    Ok(())
}

/// Runs the simulation and writes the export when a path is given.
///
/// A numerical failure still exports the partial trajectory before the error is returned.
fn execute(run: &RunConfig, export: Option<&Path>, samples: Option<usize>) -> Result<Trajectory> {
    match simulate(&run.params, &run.settings) {
        Ok(trajectory) => {
            if let Some(path) = export {
                export_trajectory(&trajectory, path, samples)?;
                info!("Exported {} rows to {}", samples.unwrap_or(trajectory.len()), path.display());
            }
            Ok(trajectory)
        }
        Err(SimulationError::NumericalFailure { reason, partial }) => {
            error!(
                %reason,
                samples = partial.len(),
                t = partial.final_time(),
                "Integration failed"
            );
            if let Some(path) = export {
                export_trajectory(&partial, path, samples)?;
                info!("Exported partial trajectory to {}", path.display());
            }
            bail!("Integration failed: {reason}")
        }
        Err(err) => Err(err).context("Invalid simulation input"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use unroll_core::integrator::SolverSettings;
    use unroll_core::params::RollParams;

    fn run_with(settings: SolverSettings) -> RunConfig {
        RunConfig {
            params: RollParams::default(),
            settings,
        }
    }

    #[test]
    fn failed_run_still_exports_partial_trajectory() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("partial.csv");
        let run = run_with(SolverSettings {
            max_step: Some(0.1),
            max_steps: 10,
            ..SolverSettings::default()
        });

        let err = execute(&run, Some(&path), None).expect_err("step budget");
        assert!(err.to_string().contains("maximum number of steps"), "got {err}");

        let text = std::fs::read_to_string(&path).expect("partial export");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "t,theta,y,r");
        assert_eq!(lines.len(), 12);
    }

    #[test]
    fn successful_run_exports_resampled_rows() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("run.json");
        let traj = execute(&run_with(SolverSettings::default()), Some(&path), Some(5))
            .expect("run");
        assert!(traj.event_fired());

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("export")).expect("json");
        assert_eq!(value["times"].as_array().expect("times").len(), 5);
    }

    #[test]
    fn invalid_input_is_reported_without_export() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("run.csv");
        let mut run = run_with(SolverSettings::default());
        run.params.r_max = run.params.r_min;

        let err = execute(&run, Some(&path), None).expect_err("invalid");
        assert!(err.to_string().contains("Invalid simulation input"));
        assert!(!path.exists());
    }
}
