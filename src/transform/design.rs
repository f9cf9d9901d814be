//! Design transform: raw model parameters → emulator features.
//!
//! The emulator is trained on the values of η/s(T_i) and ζ/s(T_i) on a fixed
//! temperature grid rather than on the raw kink/slope/width parameters. A
//! transformed row is laid out as
//!
//! ```text
//! [raw columns 0..=6, 15, 16] ++ [η/s(T_0..T_9)] ++ [ζ/s(T_0..T_9)]
//! ```
//!
//! The column order is a contract with every trained emulator.

use rayon::prelude::*;

use crate::data::params::{N_PARAMS, PARAMETERS, parameter_label};
use crate::error::PipelineError;
use crate::math::{BulkParams, ShearParams};
use crate::transform::grid::{NUM_T, temperature_grid};

/// Raw columns copied verbatim (non-viscous parameters, relaxation time, T_switch).
pub const KEPT_COLUMNS: [usize; 9] = [0, 1, 2, 3, 4, 5, 6, 15, 16];

/// Raw columns consumed by the η/s and ζ/s curves.
pub const VISCOUS_COLUMNS: [usize; 8] = [7, 8, 9, 10, 11, 12, 13, 14];

/// Width of a transformed row.
pub const TRANSFORMED_WIDTH: usize = KEPT_COLUMNS.len() + 2 * NUM_T;

/// Row count above which rows are transformed in parallel.
const PAR_THRESHOLD: usize = 256;

/// Transform a single raw design row.
pub fn transform_row(row: &[f64]) -> Result<Vec<f64>, PipelineError> {
    if row.len() != N_PARAMS {
        return Err(PipelineError::Shape(format!(
            "design row has {} columns, expected {N_PARAMS}",
            row.len()
        )));
    }
    Ok(transform_checked_row(row))
}

fn transform_checked_row(row: &[f64]) -> Vec<f64> {
    let grid = temperature_grid();
    let shear = ShearParams::from_design_row(row);
    let bulk = BulkParams::from_design_row(row);

    let mut out = Vec::with_capacity(TRANSFORMED_WIDTH);
    out.extend(KEPT_COLUMNS.iter().map(|&c| row[c]));
    out.extend(grid.iter().map(|&t| shear.eval(t)));
    out.extend(grid.iter().map(|&t| bulk.eval(t)));
    out
}

/// Transform a raw design matrix (N × 17) into the emulator feature matrix (N × 29).
pub fn transform_design(rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, PipelineError> {
    check_width(rows, N_PARAMS)?;
    let out: Vec<Vec<f64>> = if rows.len() >= PAR_THRESHOLD {
        rows.par_iter().map(|r| transform_checked_row(r)).collect()
    } else {
        rows.iter().map(|r| transform_checked_row(r)).collect()
    };
    Ok(out)
}

/// Transform a design whose columns are identified by label rather than position.
///
/// Columns are reordered into the standard contract first. Missing viscosity
/// parameters are a `Range` error (the transform cannot be built); any other
/// missing parameter is a `Shape` error.
pub fn transform_labeled(labels: &[String], rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, PipelineError> {
    let order = column_order(labels)?;
    check_width(rows, labels.len())?;
    let reordered: Vec<Vec<f64>> = rows
        .iter()
        .map(|r| order.iter().map(|&c| r[c]).collect())
        .collect();
    transform_design(&reordered)
}

/// Position of each contract parameter within `labels`.
fn column_order(labels: &[String]) -> Result<Vec<usize>, PipelineError> {
    let find = |name: &str| labels.iter().position(|l| l == name);

    let missing_viscous: Vec<&str> = VISCOUS_COLUMNS
        .iter()
        .filter_map(|&c| parameter_label(c))
        .filter(|name| find(name).is_none())
        .collect();
    if !missing_viscous.is_empty() {
        return Err(PipelineError::Range(format!(
            "design transform requires viscosity columns, missing: {}",
            missing_viscous.join(", ")
        )));
    }

    PARAMETERS
        .iter()
        .map(|(name, _)| {
            find(name).ok_or_else(|| {
                PipelineError::Shape(format!("design is missing parameter column '{name}'"))
            })
        })
        .collect()
}

fn check_width(rows: &[Vec<f64>], width: usize) -> Result<(), PipelineError> {
    if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(PipelineError::Shape(format!(
            "design row {i} has {} columns, expected {width}",
            r.len()
        )));
    }
    Ok(())
}

/// Labels of the transformed feature columns.
pub fn feature_labels() -> Vec<String> {
    let grid = temperature_grid();
    let mut out: Vec<String> = KEPT_COLUMNS
        .iter()
        .filter_map(|&c| parameter_label(c))
        .map(str::to_string)
        .collect();
    out.extend(grid.iter().map(|t| format!("eta_over_s(T={t:.4})")));
    out.extend(grid.iter().map(|t| format!("zeta_over_s(T={t:.4})")));
    out
}

/// Per-column `(min, max)` of a matrix, e.g. the transformed design's ranges.
pub fn column_ranges(rows: &[Vec<f64>]) -> Vec<(f64, f64)> {
    let width = rows.first().map_or(0, Vec::len);
    (0..width)
        .map(|c| {
            rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                (lo.min(r[c]), hi.max(r[c]))
            })
        })
        .collect()
}
