//! Prediction recombination.
//!
//! - `align`: per-observable bands on registered bins, with experiment attached
//! - `likelihood`: Gaussian log-likelihood against experiment

pub mod align;
pub mod likelihood;

pub use align::{AlignedObservable, ExpBand, align};
pub use likelihood::{exp_covariance, log_likelihood};
