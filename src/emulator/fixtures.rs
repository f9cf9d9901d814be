//! Small deterministic emulator artifacts for tests.

use crate::data::Registry;
use crate::data::params::N_PARAMS;
use crate::domain::{Idf, SystemId};
use crate::emulator::artifact::{EmulatorArtifact, GpArtifact, ObservableLayout, PcaArtifact};
use crate::transform::design::transform_design;

/// Pb-Pb-2760 Grad MAP point.
const BASE: [f64; N_PARAMS] = [
    14.2, 0.06, 1.05, 1.12, 3.00, 1.46, 0.031, 0.223, -0.78, 0.37, 0.096, 0.13, 0.12, 0.072, -0.12, 4.65, 0.136,
];

/// `n` raw design points scattered around the MAP point.
pub fn fixture_queries(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            BASE.iter()
                .enumerate()
                .map(|(j, v)| v * (1.0 + 0.05 * ((i * N_PARAMS + j) as f64 * 0.7).sin()))
                .collect()
        })
        .collect()
}

/// A two-component emulator laid out exactly like `registry`'s table for `system`.
pub fn fixture_artifact(system: &SystemId, registry: &Registry, transform: bool) -> EmulatorArtifact {
    let observables: Vec<ObservableLayout> = registry
        .observables(system)
        .map(|it| {
            it.map(|(name, bins)| ObservableLayout {
                name: name.to_string(),
                n_bins: bins.len(),
            })
            .collect()
        })
        .unwrap_or_default();
    let n_y: usize = observables.iter().map(|o| o.n_bins).sum();

    let raw = fixture_queries(6);
    let inputs = if transform {
        transform_design(&raw).unwrap_or_default()
    } else {
        raw
    };
    let width = inputs.first().map_or(0, Vec::len);

    let gp = |phase: f64| GpArtifact {
        amplitude: 1.0,
        length_scale: vec![3.0; width],
        noise: 1e-4,
        target_mean: 0.0,
        training_targets: (0..inputs.len()).map(|i| (i as f64 + phase).cos()).collect(),
        training_inputs: inputs.clone(),
    };

    let norm = (n_y as f64).sqrt();
    EmulatorArtifact {
        system: system.clone(),
        idf: Idf::Grad,
        transform_design: transform,
        observables,
        pca: PcaArtifact {
            mean: (0..n_y).map(|j| 100.0 + j as f64).collect(),
            scale: vec![2.0; n_y],
            components: vec![
                vec![1.0 / norm; n_y],
                (0..n_y).map(|j| (if j % 2 == 0 { 1.0 } else { -1.0 }) / norm).collect(),
            ],
            explained_variance: vec![3.0, 0.5],
            residual_variance: Some(
                (0..n_y)
                    .map(|i| (0..n_y).map(|j| if i == j { 0.01 } else { 0.0 }).collect())
                    .collect(),
            ),
        },
        gps: vec![gp(0.0), gp(1.3)],
    }
}
