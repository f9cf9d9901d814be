//! Error types.
//!
//! The library reports failures through `PipelineError`, one variant per
//! contract violation. The `hic` binary converts these into `AppError`, which
//! carries the process exit code:
//!
//! - `2`: bad input, configuration or I/O
//! - `3`: data that does not line up (alignment, unknown keys)
//! - `4`: model or numeric failures

use thiserror::Error;

/// Failures raised by the transform / emulator / recombination pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A matrix or vector does not have the shape the column contract requires.
    #[error("shape error: {0}")]
    Shape(String),

    /// The design transform was requested but the viscosity columns are missing.
    #[error("range error: {0}")]
    Range(String),

    /// Registry lookup for an unregistered system or observable.
    #[error("unknown key: {system}/{observable}")]
    UnknownKey { system: String, observable: String },

    /// The emulator was queried before a trained model was loaded.
    #[error("emulator queried before a trained model was loaded")]
    UntrainedModel,

    /// Query width disagrees with the trained model's input width.
    #[error("dimension mismatch: expected {expected} parameters, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Bin counts disagree between emulator output, registry and experiment.
    #[error("alignment error for '{observable}': {message}")]
    Alignment { observable: String, message: String },

    /// The trained-model artifact is internally inconsistent.
    #[error("invalid emulator artifact: {0}")]
    Artifact(String),

    /// A file could not be read or written.
    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },

    /// A file was readable but its contents could not be parsed.
    #[error("parse error in '{path}': {message}")]
    Parse { path: String, message: String },

    /// Linear algebra failed (e.g. covariance not positive definite).
    #[error("numeric error: {0}")]
    Numeric(String),

    /// Invalid settings or lookup tables.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn unknown_key(system: impl Into<String>, observable: impl Into<String>) -> Self {
        Self::UnknownKey {
            system: system.into(),
            observable: observable.into(),
        }
    }

    pub fn alignment(observable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Alignment {
            observable: observable.into(),
            message: message.into(),
        }
    }

    pub fn io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub fn parse(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Exit code used by the binary when this error reaches `main`.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Shape(_)
            | Self::Range(_)
            | Self::Io { .. }
            | Self::Parse { .. }
            | Self::Config(_) => 2,
            Self::UnknownKey { .. } | Self::Alignment { .. } => 3,
            Self::UntrainedModel
            | Self::DimensionMismatch { .. }
            | Self::Artifact(_)
            | Self::Numeric(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_exit_codes() {
        let err: AppError = PipelineError::alignment("v22", "8 vs 9 bins").into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("v22"));

        let err: AppError = PipelineError::UntrainedModel.into();
        assert_eq!(err.exit_code(), 4);

        let err: AppError = PipelineError::Shape("bad".into()).into();
        assert_eq!(err.exit_code(), 2);
    }
}
