//! Serialized trained-emulator artifact.
//!
//! The artifact captures everything a query needs and nothing training needs:
//!
//! - the observable layout of the emulated output vector
//! - the principal-component reduction of that vector
//! - one Gaussian process per retained principal component
//!
//! It is produced by the (external) training step and treated as read-only.

use serde::{Deserialize, Serialize};

use crate::domain::{Idf, SystemId};

/// One observable's slot in the flattened output vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableLayout {
    pub name: String,
    pub n_bins: usize,
}

/// Principal-component reduction of the standardized output vector.
///
/// Outputs are standardized as `(y - mean) / scale` before PCA; component
/// scores are whitened by `sqrt(explained_variance)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaArtifact {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    /// Retained components, `npc × n_y`, row-major.
    pub components: Vec<Vec<f64>>,
    pub explained_variance: Vec<f64>,
    /// Covariance contributed by the discarded components (`n_y × n_y`).
    #[serde(default)]
    pub residual_variance: Option<Vec<Vec<f64>>>,
}

/// A Gaussian process over the transformed design for one principal component.
///
/// Kernel: `amplitude² · exp(-½ Σ_d ((x_d - x'_d) / length_scale_d)²) + noise · δ`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpArtifact {
    pub amplitude: f64,
    pub length_scale: Vec<f64>,
    pub noise: f64,
    /// Constant subtracted from the targets before conditioning.
    #[serde(default)]
    pub target_mean: f64,
    pub training_inputs: Vec<Vec<f64>>,
    pub training_targets: Vec<f64>,
}

/// A complete trained emulator for one system and particlization model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmulatorArtifact {
    pub system: SystemId,
    pub idf: Idf,
    /// Whether the GP inputs are transformed design rows.
    pub transform_design: bool,
    pub observables: Vec<ObservableLayout>,
    pub pca: PcaArtifact,
    pub gps: Vec<GpArtifact>,
}

impl EmulatorArtifact {
    /// Length of the flattened output vector.
    pub fn n_outputs(&self) -> usize {
        self.observables.iter().map(|o| o.n_bins).sum()
    }
}
