//! Gaussian-process inference for one principal component.
//!
//! Everything that depends only on the training data is computed once in
//! `GaussianProcess::from_artifact`:
//!
//! - `L`, the Cholesky factor of `K(X, X) + noise · I`
//! - `α = K⁻¹ (y - ȳ)`
//!
//! A query then costs one kernel row, a dot product for the mean and one
//! triangular solve for the variance.

use nalgebra::{DMatrix, DVector};

use crate::emulator::artifact::GpArtifact;
use crate::error::PipelineError;
use crate::math::cholesky;

#[derive(Debug, Clone)]
pub struct GaussianProcess {
    amplitude_sq: f64,
    inv_length: Vec<f64>,
    noise: f64,
    target_mean: f64,
    /// Training inputs, one row per point.
    x_train: DMatrix<f64>,
    l: DMatrix<f64>,
    alpha: DVector<f64>,
}

impl GaussianProcess {
    pub fn from_artifact(gp: &GpArtifact) -> Result<Self, PipelineError> {
        let n = gp.training_inputs.len();
        let d = gp.length_scale.len();
        if n == 0 {
            return Err(PipelineError::Artifact("GP has no training points".to_string()));
        }
        if gp.training_targets.len() != n {
            return Err(PipelineError::Artifact(format!(
                "GP has {n} training inputs but {} targets",
                gp.training_targets.len()
            )));
        }
        if let Some(row) = gp.training_inputs.iter().find(|r| r.len() != d) {
            return Err(PipelineError::Artifact(format!(
                "GP training input of width {} vs {d} length scales",
                row.len()
            )));
        }
        if !(gp.amplitude.is_finite() && gp.noise.is_finite() && gp.noise >= 0.0) {
            return Err(PipelineError::Artifact("GP amplitude/noise must be finite".to_string()));
        }
        if gp.length_scale.iter().any(|l| !(l.is_finite() && *l > 0.0)) {
            return Err(PipelineError::Artifact("GP length scales must be finite and > 0".to_string()));
        }

        let x_train = DMatrix::from_fn(n, d, |i, j| gp.training_inputs[i][j]);
        let mut this = Self {
            amplitude_sq: gp.amplitude * gp.amplitude,
            inv_length: gp.length_scale.iter().map(|l| 1.0 / l).collect(),
            noise: gp.noise,
            target_mean: gp.target_mean,
            x_train,
            l: DMatrix::zeros(0, 0),
            alpha: DVector::zeros(0),
        };

        let mut k = DMatrix::from_fn(n, n, |i, j| this.kernel_rows(i, j));
        for i in 0..n {
            k[(i, i)] += this.noise;
        }
        let chol = cholesky(&k).map_err(|e| PipelineError::Artifact(format!("GP kernel matrix: {e}")))?;
        let y = DVector::from_iterator(n, gp.training_targets.iter().map(|t| t - gp.target_mean));
        this.alpha = chol.solve(&y);
        this.l = chol.l();
        Ok(this)
    }

    /// Input width expected by the kernel.
    pub fn input_dim(&self) -> usize {
        self.inv_length.len()
    }

    fn kernel_rows(&self, i: usize, j: usize) -> f64 {
        let mut s = 0.0;
        for (c, inv) in self.inv_length.iter().enumerate() {
            let z = (self.x_train[(i, c)] - self.x_train[(j, c)]) * inv;
            s += z * z;
        }
        self.amplitude_sq * (-0.5 * s).exp()
    }

    fn kernel_to_train(&self, x: &[f64]) -> DVector<f64> {
        DVector::from_fn(self.x_train.nrows(), |i, _| {
            let mut s = 0.0;
            for (c, inv) in self.inv_length.iter().enumerate() {
                let z = (x[c] - self.x_train[(i, c)]) * inv;
                s += z * z;
            }
            self.amplitude_sq * (-0.5 * s).exp()
        })
    }

    /// Posterior mean and variance at `x`. The caller checks the width.
    pub fn predict(&self, x: &[f64]) -> Result<(f64, f64), PipelineError> {
        let k_star = self.kernel_to_train(x);
        let mean = self.target_mean + k_star.dot(&self.alpha);
        let v = self
            .l
            .solve_lower_triangular(&k_star)
            .ok_or_else(|| PipelineError::Numeric("GP triangular solve failed".to_string()))?;
        let var = (self.amplitude_sq + self.noise - v.norm_squared()).max(0.0);
        Ok((mean, var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_gp(noise: f64) -> GpArtifact {
        GpArtifact {
            amplitude: 2.0,
            length_scale: vec![0.5],
            noise,
            target_mean: 1.0,
            training_inputs: vec![vec![0.0], vec![1.0], vec![2.0]],
            training_targets: vec![1.0, 3.0, 0.0],
        }
    }

    #[test]
    fn interpolates_training_points_without_noise() {
        let gp = GaussianProcess::from_artifact(&toy_gp(1e-10)).unwrap();
        for (x, y) in [(0.0, 1.0), (1.0, 3.0), (2.0, 0.0)] {
            let (mean, var) = gp.predict(&[x]).unwrap();
            assert!((mean - y).abs() < 1e-5, "mean at {x}: {mean}");
            assert!(var < 1e-5, "variance at {x}: {var}");
        }
    }

    #[test]
    fn reverts_to_prior_far_from_data() {
        let gp = GaussianProcess::from_artifact(&toy_gp(1e-4)).unwrap();
        let (mean, var) = gp.predict(&[50.0]).unwrap();
        assert!((mean - 1.0).abs() < 1e-12);
        assert!((var - (4.0 + 1e-4)).abs() < 1e-9);
        assert_eq!(gp.input_dim(), 1);
    }

    #[test]
    fn rejects_inconsistent_artifacts() {
        let mut bad = toy_gp(1e-4);
        bad.training_targets.pop();
        assert!(matches!(GaussianProcess::from_artifact(&bad), Err(PipelineError::Artifact(_))));

        let mut bad = toy_gp(1e-4);
        bad.length_scale = vec![0.0];
        assert!(matches!(GaussianProcess::from_artifact(&bad), Err(PipelineError::Artifact(_))));

        let mut bad = toy_gp(1e-4);
        bad.training_inputs[1] = vec![1.0, 2.0];
        assert!(matches!(GaussianProcess::from_artifact(&bad), Err(PipelineError::Artifact(_))));
    }
}
