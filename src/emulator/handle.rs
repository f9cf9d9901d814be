//! Load-once access to a trained emulator.
//!
//! Loading is explicit (`load`) and idempotent: the first call reads and
//! validates the artifact, later calls return the same `Arc`. A failed load is
//! remembered and returned again; there is no retry and never a partially
//! initialized emulator. Querying before `load` is an `UntrainedModel` error.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::emulator::bundle::PredictionBundle;
use crate::emulator::model::Emulator;
use crate::error::PipelineError;
use crate::io::artifact::read_artifact;

#[derive(Debug)]
pub struct EmulatorHandle {
    path: PathBuf,
    cell: OnceLock<Result<Arc<Emulator>, PipelineError>>,
}

impl EmulatorHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the artifact (first call only).
    pub fn load(&self) -> Result<Arc<Emulator>, PipelineError> {
        self.cell
            .get_or_init(|| {
                info!(path = %self.path.display(), "loading emulator");
                let artifact = read_artifact(&self.path)?;
                Emulator::from_artifact(&artifact).map(Arc::new)
            })
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.cell.get(), Some(Ok(_)))
    }

    /// The loaded emulator, without triggering a load.
    pub fn get(&self) -> Result<Arc<Emulator>, PipelineError> {
        match self.cell.get() {
            Some(result) => result.clone(),
            None => Err(PipelineError::UntrainedModel),
        }
    }

    pub fn predict(&self, params: &[Vec<f64>]) -> Result<PredictionBundle, PipelineError> {
        self.get()?.predict(params)
    }
}
