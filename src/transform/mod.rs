//! Design transformation.
//!
//! Responsibilities:
//!
//! - fixed temperature grid for curve sampling
//! - raw design → emulator feature matrix
//! - tabulation of the η/s and ζ/s curves for inspection

pub mod design;
pub mod grid;
pub mod viscosity_table;

pub use design::*;
pub use grid::*;
pub use viscosity_table::*;
