//! `hic-emulator` library crate.
//!
//! Design transform, emulator query and prediction recombination for Bayesian
//! calibration of heavy-ion collision models. The binary (`hic`) is a thin
//! wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the emulator can be embedded in other front-ends (samplers, notebooks)

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod emulator;
pub mod error;
pub mod io;
pub mod math;
pub mod recombine;
pub mod report;
pub mod transform;
