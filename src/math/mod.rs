//! Mathematical utilities: transport-coefficient curves and Cholesky-based linear algebra.

pub mod linalg;
pub mod viscosity;

pub use linalg::*;
pub use viscosity::*;
