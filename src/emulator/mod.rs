//! Emulator query adapter.
//!
//! - `artifact`: serialized trained model (layout + PCA + GPs)
//! - `gp` / `pca`: inference building blocks
//! - `model`: the immutable `Emulator` answering batched `predict` queries
//! - `bundle`: per-observable views of a prediction
//! - `handle`: explicit load-once initialization

pub mod artifact;
pub mod bundle;
pub mod gp;
pub mod handle;
pub mod model;
pub mod pca;

#[cfg(test)]
pub(crate) mod fixtures;

pub use artifact::*;
pub use bundle::PredictionBundle;
pub use handle::EmulatorHandle;
pub use model::Emulator;
