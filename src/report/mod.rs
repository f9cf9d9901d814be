//! Plain-text reporting for the `hic` subcommands.

pub mod format;

pub use format::*;
