//! Trained emulator: design transform + per-component GPs + PCA reconstruction.
//!
//! Input contract: `predict` always takes raw design points in the 17-column
//! parameter order. When the artifact was trained on transformed designs the
//! transform is applied here; the choice is fixed when the artifact is loaded.

use std::ops::Range;

use indexmap::IndexMap;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::debug;

use crate::data::params::N_PARAMS;
use crate::domain::{Idf, SystemId};
use crate::emulator::artifact::EmulatorArtifact;
use crate::emulator::bundle::PredictionBundle;
use crate::emulator::gp::GaussianProcess;
use crate::emulator::pca::PcaTransform;
use crate::error::PipelineError;
use crate::transform::design::transform_row;

/// A loaded, immutable emulator. `Send + Sync`; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Emulator {
    system: SystemId,
    idf: Idf,
    transform_design: bool,
    layout: IndexMap<String, Range<usize>>,
    pca: PcaTransform,
    gps: Vec<GaussianProcess>,
    feature_width: usize,
}

impl Emulator {
    /// Validate an artifact and precompute all training-side factorizations.
    pub fn from_artifact(artifact: &EmulatorArtifact) -> Result<Self, PipelineError> {
        let mut layout = IndexMap::with_capacity(artifact.observables.len());
        let mut offset = 0;
        for obs in &artifact.observables {
            if obs.n_bins == 0 {
                return Err(PipelineError::Artifact(format!("observable '{}' has no bins", obs.name)));
            }
            if layout.insert(obs.name.clone(), offset..offset + obs.n_bins).is_some() {
                return Err(PipelineError::Artifact(format!("observable '{}' listed twice", obs.name)));
            }
            offset += obs.n_bins;
        }

        let pca = PcaTransform::from_artifact(&artifact.pca, offset)?;
        if artifact.gps.len() != pca.n_components() {
            return Err(PipelineError::Artifact(format!(
                "{} GPs for {} principal components",
                artifact.gps.len(),
                pca.n_components()
            )));
        }

        let gps = artifact
            .gps
            .iter()
            .map(GaussianProcess::from_artifact)
            .collect::<Result<Vec<_>, _>>()?;
        let feature_width = gps[0].input_dim();
        if gps.iter().any(|gp| gp.input_dim() != feature_width) {
            return Err(PipelineError::Artifact("GPs disagree on input width".to_string()));
        }
        if artifact.transform_design && feature_width != crate::transform::TRANSFORMED_WIDTH {
            return Err(PipelineError::Artifact(format!(
                "transformed-design emulator expects {} inputs, GPs take {feature_width}",
                crate::transform::TRANSFORMED_WIDTH
            )));
        }

        debug!(
            system = %artifact.system,
            idf = artifact.idf.short_label(),
            npc = gps.len(),
            n_outputs = offset,
            "emulator artifact validated"
        );

        Ok(Self {
            system: artifact.system.clone(),
            idf: artifact.idf,
            transform_design: artifact.transform_design,
            layout,
            pca,
            gps,
            feature_width,
        })
    }

    pub fn system(&self) -> &SystemId {
        &self.system
    }

    pub fn idf(&self) -> Idf {
        self.idf
    }

    pub fn transforms_design(&self) -> bool {
        self.transform_design
    }

    /// Number of principal components (one GP each).
    pub fn n_components(&self) -> usize {
        self.gps.len()
    }

    /// Width of the parameter vectors `predict` accepts.
    pub fn input_width(&self) -> usize {
        if self.transform_design { N_PARAMS } else { self.feature_width }
    }

    /// Emulated observables with their bin counts, in output order.
    pub fn observables(&self) -> impl Iterator<Item = (&str, usize)> {
        self.layout.iter().map(|(name, r)| (name.as_str(), r.len()))
    }

    /// Predict a batch of parameter vectors.
    pub fn predict(&self, params: &[Vec<f64>]) -> Result<PredictionBundle, PipelineError> {
        self.predict_held(params, &[])
    }

    /// Predict with some parameters forced to fixed values first.
    pub fn predict_held(&self, params: &[Vec<f64>], hold: &[(usize, f64)]) -> Result<PredictionBundle, PipelineError> {
        if params.is_empty() {
            return Err(PipelineError::Shape("empty prediction batch".to_string()));
        }
        let expected = self.input_width();
        if let Some(row) = params.iter().find(|r| r.len() != expected) {
            return Err(PipelineError::DimensionMismatch {
                expected,
                actual: row.len(),
            });
        }
        if let Some(&(idx, _)) = hold.iter().find(|(idx, _)| *idx >= expected) {
            return Err(PipelineError::Config(format!(
                "held parameter index {idx} out of range for {expected} parameters"
            )));
        }

        let results: Vec<(DVector<f64>, DMatrix<f64>)> = params
            .par_iter()
            .map(|row| {
                let mut row = row.clone();
                for &(idx, value) in hold {
                    row[idx] = value;
                }
                self.predict_row(&row)
            })
            .collect::<Result<_, _>>()?;

        let (means, covs) = results.into_iter().unzip();
        debug!(queries = params.len(), "emulator prediction complete");
        Ok(PredictionBundle::new(self.system.clone(), self.layout.clone(), means, covs))
    }

    fn predict_row(&self, row: &[f64]) -> Result<(DVector<f64>, DMatrix<f64>), PipelineError> {
        let features = if self.transform_design {
            transform_row(row)?
        } else {
            row.to_vec()
        };

        let npc = self.gps.len();
        let mut z = DVector::zeros(npc);
        let mut var = DVector::zeros(npc);
        for (k, gp) in self.gps.iter().enumerate() {
            let (m, v) = gp.predict(&features)?;
            z[k] = m;
            var[k] = v;
        }
        Ok((self.pca.inverse_mean(&z), self.pca.inverse_cov(&var)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::registry::{Registry, au_au_200, pb_pb_2760, xe_xe_5440};
    use crate::emulator::fixtures::{fixture_artifact, fixture_queries};

    #[test]
    fn batch_means_match_registry_bins() {
        let registry = Registry::standard().unwrap();
        for system in [xe_xe_5440(), au_au_200()] {
            let emu = Emulator::from_artifact(&fixture_artifact(&system, registry, true)).unwrap();
            let bundle = emu.predict(&fixture_queries(3)).unwrap();
            assert_eq!(bundle.n_queries(), 3);

            let means = bundle.mean_by_observable();
            for (name, bins) in registry.observables(&system).unwrap() {
                let rows = &means[name];
                assert_eq!(rows.len(), 3);
                assert!(rows.iter().all(|r| r.len() == bins.len()), "{system}/{name}");
            }
        }
    }

    #[test]
    fn covariance_blocks_have_pair_shapes() {
        let registry = Registry::standard().unwrap();
        let system = xe_xe_5440();
        let emu = Emulator::from_artifact(&fixture_artifact(&system, registry, true)).unwrap();
        let bundle = emu.predict(&fixture_queries(2)).unwrap();

        let within = bundle.covariance("v22", "v22").unwrap();
        assert_eq!(within.len(), 2);
        assert_eq!(within[0].shape(), (8, 8));
        let cross = bundle.covariance("dNch_deta", "v32").unwrap();
        assert_eq!(cross[1].shape(), (10, 8));
        let back = bundle.covariance("v32", "dNch_deta").unwrap();
        assert!((cross[1].transpose() - &back[1]).abs().max() < 1e-12);

        for i in 0..8 {
            assert!(within[0][(i, i)] >= 0.0);
        }
        assert!(matches!(bundle.covariance("v22", "v42"), Err(PipelineError::UnknownKey { .. })));
    }

    #[test]
    fn wrong_width_is_dimension_mismatch() {
        let registry = Registry::standard().unwrap();
        let emu = Emulator::from_artifact(&fixture_artifact(&xe_xe_5440(), registry, true)).unwrap();
        let mut queries = fixture_queries(2);
        queries[1].push(0.0);
        match emu.predict(&queries) {
            Err(PipelineError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 17);
                assert_eq!(actual, 18);
            }
            other => panic!("expected dimension mismatch, got {other:?}"),
        }
    }

    #[test]
    fn untransformed_emulator_takes_feature_width() {
        let registry = Registry::standard().unwrap();
        let emu = Emulator::from_artifact(&fixture_artifact(&xe_xe_5440(), registry, false)).unwrap();
        assert_eq!(emu.input_width(), 17);
        assert!(!emu.transforms_design());
        assert!(emu.predict(&fixture_queries(1)).is_ok());
    }

    #[test]
    fn predictions_are_pure_and_order_independent() {
        let registry = Registry::standard().unwrap();
        let emu = Emulator::from_artifact(&fixture_artifact(&au_au_200(), registry, true)).unwrap();
        let queries = fixture_queries(3);
        let all = emu.predict(&queries).unwrap();
        let last = emu.predict(&queries[2..]).unwrap();
        assert_eq!(all.full_mean(2), last.full_mean(0));
        assert_eq!(all.full_covariance(2), last.full_covariance(0));
    }

    #[test]
    fn held_parameters_override_queries() {
        let registry = Registry::standard().unwrap();
        let emu = Emulator::from_artifact(&fixture_artifact(&xe_xe_5440(), registry, true)).unwrap();
        let queries = fixture_queries(2);
        let held = emu.predict_held(&queries, &[(0, 9.0), (10, 0.05)]).unwrap();

        let mut manual = queries.clone();
        for row in &mut manual {
            row[0] = 9.0;
            row[10] = 0.05;
        }
        let direct = emu.predict(&manual).unwrap();
        assert_eq!(held.full_mean(1), direct.full_mean(1));
        assert!(emu.predict_held(&queries, &[(17, 0.0)]).is_err());
    }

    #[test]
    fn inconsistent_artifacts_are_rejected() {
        let registry = Registry::standard().unwrap();
        let mut artifact = fixture_artifact(&pb_pb_2760(), registry, true);
        artifact.gps.pop();
        assert!(matches!(Emulator::from_artifact(&artifact), Err(PipelineError::Artifact(_))));

        let mut artifact = fixture_artifact(&xe_xe_5440(), registry, true);
        artifact.observables[0].n_bins += 1;
        assert!(matches!(Emulator::from_artifact(&artifact), Err(PipelineError::Artifact(_))));
    }

    #[test]
    fn emulator_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Emulator>();
    }
}
