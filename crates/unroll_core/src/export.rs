//! Tabular export of trajectories for external plotting tools.

use crate::trajectory::{Sample, Trajectory};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(ExportFormat::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ExportFormat::Json),
            _ => bail!(
                "Cannot infer export format from \"{}\"; use a .csv or .json extension.",
                path.display()
            ),
        }
    }
}

fn check_widths(variables: &[String], samples: &[Sample]) -> Result<()> {
    if let Some(sample) = samples.iter().find(|s| s.state.len() != variables.len()) {
        bail!(
            "Sample at t = {} has {} components, expected {}.",
            sample.t,
            sample.state.len(),
            variables.len()
        );
    }
    Ok(())
}

/// Writes `t,<variables...>` rows, one per sample.
pub fn write_csv<W: Write>(writer: &mut W, variables: &[String], samples: &[Sample]) -> Result<()> {
    check_widths(variables, samples)?;
    write!(writer, "t")?;
    for name in variables {
        write!(writer, ",{name}")?;
    }
    writeln!(writer)?;
    for sample in samples {
        write!(writer, "{}", sample.t)?;
        for value in &sample.state {
            write!(writer, ",{value}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonTable<'a> {
    variables: &'a [String],
    times: Vec<f64>,
    columns: Vec<Vec<f64>>,
}

/// Writes a column-oriented JSON table: `{variables, times, columns}`.
pub fn write_json<W: Write>(writer: &mut W, variables: &[String], samples: &[Sample]) -> Result<()> {
    check_widths(variables, samples)?;
    let columns = (0..variables.len())
        .map(|idx| samples.iter().map(|s| s.state[idx]).collect())
        .collect();
    let table = JsonTable {
        variables,
        times: samples.iter().map(|s| s.t).collect(),
        columns,
    };
    serde_json::to_writer_pretty(&mut *writer, &table).context("Failed to serialize trajectory")?;
    writeln!(writer)?;
    Ok(())
}

/// Exports the accepted samples, or `resample` evenly spaced ones when given.
pub fn export_trajectory(
    trajectory: &Trajectory,
    path: &Path,
    resample: Option<usize>,
) -> Result<()> {
    let format = ExportFormat::from_path(path)?;
    let samples: Vec<Sample> = match resample {
        Some(count) => trajectory.resample(count),
        None => trajectory
            .points
            .iter()
            .map(|p| Sample {
                t: p.t,
                state: p.state.clone(),
            })
            .collect(),
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    match format {
        ExportFormat::Csv => write_csv(&mut writer, &trajectory.variables, &samples)?,
        ExportFormat::Json => write_json(&mut writer, &trajectory.variables, &samples)?,
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
