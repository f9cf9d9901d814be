//! Tabulated η/s and ζ/s curves for a single parameter vector.

use serde::Serialize;

use crate::data::params::N_PARAMS;
use crate::error::PipelineError;
use crate::math::{BulkParams, ShearParams, tau_pi};
use crate::transform::grid::linspace;

/// Default display range [GeV].
pub const DISPLAY_T_LOW: f64 = 0.1;
pub const DISPLAY_T_HIGH: f64 = 0.35;
pub const DISPLAY_POINTS: usize = 100;

/// One sampled temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViscosityPoint {
    pub temperature: f64,
    pub eta_over_s: f64,
    pub zeta_over_s: f64,
    /// Shear relaxation time [GeV⁻¹].
    pub tau_pi: f64,
}

/// Column of the shear relaxation time normalization `b_π`.
const B_PI: usize = 15;

/// Sample both transport curves of a raw parameter vector on `[t_low, t_high]`,
/// together with the shear relaxation time they imply.
pub fn viscosity_table(
    params: &[f64],
    t_low: f64,
    t_high: f64,
    points: usize,
) -> Result<Vec<ViscosityPoint>, PipelineError> {
    if params.len() != N_PARAMS {
        return Err(PipelineError::Shape(format!(
            "parameter vector has {} entries, expected {N_PARAMS}",
            params.len()
        )));
    }
    let shear = ShearParams::from_design_row(params);
    let bulk = BulkParams::from_design_row(params);
    Ok(linspace(t_low, t_high, points)?
        .into_iter()
        .map(|t| ViscosityPoint {
            temperature: t,
            eta_over_s: shear.eval(t),
            zeta_over_s: bulk.eval(t),
            tau_pi: tau_pi(t, &shear, params[B_PI]),
        })
        .collect())
}
