//! Read/write trained emulator artifacts.
//!
//! The artifact is the portable representation of a trained emulator:
//! - system, particlization model and whether inputs are design-transformed
//! - the observable layout of the output vector
//! - PCA reconstruction and one GP per principal component
//!
//! The schema is defined by `emulator::EmulatorArtifact`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::emulator::artifact::EmulatorArtifact;
use crate::error::PipelineError;

/// Write an artifact as pretty-printed JSON.
pub fn write_artifact(path: &Path, artifact: &EmulatorArtifact) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::to_writer_pretty(file, artifact).map_err(|e| PipelineError::io(path, e))
}

/// Read an artifact. Schema violations are `Artifact` errors.
pub fn read_artifact(path: &Path) -> Result<EmulatorArtifact, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| PipelineError::Artifact(format!("{}: {e}", path.display())))
}
