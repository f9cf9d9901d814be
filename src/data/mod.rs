//! Static tables: centrality registry and model parameter contracts.

pub mod params;
pub mod registry;

pub use params::*;
pub use registry::{Registry, RegistryBuilder};
