//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - identifiers (`SystemId`, `Idf`, `PointSet`)
//! - centrality classes (`CentralityBin`)
//! - the analysis switches threaded through every stage (`AnalysisConfig`)

pub mod types;

pub use types::*;
