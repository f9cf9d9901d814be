//! Mapping between principal-component scores and physical observables.
//!
//! With standardization `scale`, components `V` (`npc × n_y`) and explained
//! variances `σ²`, the transformation matrix is
//!
//! `T = diag(σ) · V · diag(scale)`
//!
//! so that a score vector `z` maps to `y = zᵀ T + mean`, and independent score
//! variances `var_z` map to `Cov(y) = Tᵀ diag(var_z) T + Σ_residual`.

use nalgebra::{DMatrix, DVector};

use crate::emulator::artifact::PcaArtifact;
use crate::error::PipelineError;

#[derive(Debug, Clone)]
pub struct PcaTransform {
    mean: DVector<f64>,
    trans: DMatrix<f64>,
    residual: Option<DMatrix<f64>>,
}

impl PcaTransform {
    pub fn from_artifact(pca: &PcaArtifact, n_outputs: usize) -> Result<Self, PipelineError> {
        let npc = pca.components.len();
        if npc == 0 {
            return Err(PipelineError::Artifact("PCA has no components".to_string()));
        }
        if pca.mean.len() != n_outputs || pca.scale.len() != n_outputs {
            return Err(PipelineError::Artifact(format!(
                "PCA mean/scale lengths {}/{} vs {n_outputs} outputs",
                pca.mean.len(),
                pca.scale.len()
            )));
        }
        if pca.explained_variance.len() != npc {
            return Err(PipelineError::Artifact(format!(
                "{npc} components but {} explained variances",
                pca.explained_variance.len()
            )));
        }
        if pca.components.iter().any(|c| c.len() != n_outputs) {
            return Err(PipelineError::Artifact(format!(
                "PCA component length differs from {n_outputs} outputs"
            )));
        }
        if pca.explained_variance.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(PipelineError::Artifact("explained variances must be >= 0".to_string()));
        }

        let trans = DMatrix::from_fn(npc, n_outputs, |k, j| {
            pca.explained_variance[k].sqrt() * pca.components[k][j] * pca.scale[j]
        });

        let residual = match &pca.residual_variance {
            None => None,
            Some(rows) => {
                if rows.len() != n_outputs || rows.iter().any(|r| r.len() != n_outputs) {
                    return Err(PipelineError::Artifact(format!(
                        "residual variance must be {n_outputs}x{n_outputs}"
                    )));
                }
                Some(DMatrix::from_fn(n_outputs, n_outputs, |i, j| rows[i][j]))
            }
        };

        Ok(Self {
            mean: DVector::from_column_slice(&pca.mean),
            trans,
            residual,
        })
    }

    pub fn n_components(&self) -> usize {
        self.trans.nrows()
    }

    /// Physical-space mean for component scores `z`.
    pub fn inverse_mean(&self, z: &DVector<f64>) -> DVector<f64> {
        self.trans.tr_mul(z) + &self.mean
    }

    /// Physical-space covariance for independent component variances.
    pub fn inverse_cov(&self, var_z: &DVector<f64>) -> DMatrix<f64> {
        let weighted = DMatrix::from_fn(self.trans.nrows(), self.trans.ncols(), |k, j| {
            var_z[k] * self.trans[(k, j)]
        });
        let cov = self.trans.tr_mul(&weighted);
        match &self.residual {
            Some(r) => cov + r,
            None => cov,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> PcaArtifact {
        PcaArtifact {
            mean: vec![10.0, 20.0, 30.0],
            scale: vec![1.0, 2.0, 3.0],
            components: vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.6, 0.8]],
            explained_variance: vec![4.0, 1.0],
            residual_variance: None,
        }
    }

    #[test]
    fn inverse_mean_applies_whitening_and_scale() {
        let pca = PcaTransform::from_artifact(&artifact(), 3).unwrap();
        let y = pca.inverse_mean(&DVector::from_row_slice(&[1.0, 1.0]));
        // T = [[2, 0, 0], [0, 1.2, 2.4]]
        assert!((y[0] - 12.0).abs() < 1e-12);
        assert!((y[1] - 21.2).abs() < 1e-12);
        assert!((y[2] - 32.4).abs() < 1e-12);
    }

    #[test]
    fn inverse_cov_is_symmetric_and_adds_residual() {
        let mut a = artifact();
        a.residual_variance = Some(vec![vec![0.5, 0.0, 0.0], vec![0.0, 0.5, 0.0], vec![0.0, 0.0, 0.5]]);
        let pca = PcaTransform::from_artifact(&a, 3).unwrap();
        let cov = pca.inverse_cov(&DVector::from_row_slice(&[1.0, 2.0]));
        assert!((cov[(0, 0)] - 4.5).abs() < 1e-12);
        assert!((cov[(1, 2)] - 2.0 * 1.2 * 2.4).abs() < 1e-12);
        assert!((cov[(1, 2)] - cov[(2, 1)]).abs() < 1e-12);
        assert!(cov[(0, 1)].abs() < 1e-12);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(PcaTransform::from_artifact(&artifact(), 4).is_err());
        let mut a = artifact();
        a.explained_variance.pop();
        assert!(PcaTransform::from_artifact(&a, 3).is_err());
    }
}
