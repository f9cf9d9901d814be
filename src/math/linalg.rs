//! Dense linear algebra helpers built on `nalgebra`.
//!
//! Two operations recur in the pipeline:
//!
//! - factorizing a symmetric positive-definite matrix once and reusing it
//!   (GP kernel matrices at load time)
//! - evaluating a multivariate normal log-density (likelihood of experiment
//!   given the emulator)
//!
//! Both go through a Cholesky factorization. A small diagonal jitter ladder is
//! tried before declaring a matrix not positive definite.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use crate::error::PipelineError;

/// Relative diagonal jitter attempted when a plain Cholesky fails.
const JITTER_LADDER: [f64; 4] = [0.0, 1e-12, 1e-10, 1e-8];

/// Cholesky-factorize a symmetric positive-definite matrix.
pub fn cholesky(m: &DMatrix<f64>) -> Result<Cholesky<f64, Dyn>, PipelineError> {
    if !m.is_square() {
        return Err(PipelineError::Shape(format!(
            "cholesky of non-square {}x{} matrix",
            m.nrows(),
            m.ncols()
        )));
    }
    let scale = m.diagonal().iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);
    for &jitter in &JITTER_LADDER {
        let mut work = m.clone();
        if jitter > 0.0 {
            for i in 0..work.nrows() {
                work[(i, i)] += jitter * scale;
            }
        }
        if let Some(chol) = work.cholesky() {
            return Ok(chol);
        }
    }
    Err(PipelineError::Numeric(format!(
        "{}x{} matrix is not positive definite",
        m.nrows(),
        m.ncols()
    )))
}

/// `ln N(r | 0, Σ)` for residual `r` and covariance `Σ`.
pub fn gaussian_log_density(residual: &DVector<f64>, cov: &DMatrix<f64>) -> Result<f64, PipelineError> {
    if cov.nrows() != residual.len() {
        return Err(PipelineError::Shape(format!(
            "residual of length {} vs {}x{} covariance",
            residual.len(),
            cov.nrows(),
            cov.ncols()
        )));
    }
    let chol = cholesky(cov)?;
    let l = chol.l();
    let z = l
        .solve_lower_triangular(residual)
        .ok_or_else(|| PipelineError::Numeric("singular Cholesky factor".to_string()))?;
    let log_det: f64 = 2.0 * l.diagonal().iter().map(|d| d.ln()).sum::<f64>();
    let n = residual.len() as f64;
    Ok(-0.5 * (z.norm_squared() + log_det + n * (2.0 * std::f64::consts::PI).ln()))
}
