//! Input/output helpers.
//!
//! - design / range / label loading (`design`)
//! - experimental measurements (`experiment`)
//! - trained emulator artifacts (`artifact`)
//! - CSV exports (`export`) and prediction JSON (`prediction`)

pub mod artifact;
pub mod design;
pub mod experiment;
pub mod export;
pub mod prediction;

pub use artifact::*;
pub use design::{DesignTable, load_design, load_labels, load_ranges};
pub use experiment::{ExpData, ExpObservable};
pub use export::*;
pub use prediction::*;
