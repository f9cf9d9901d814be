//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during transform / prediction
//! - exported to JSON/CSV
//! - embedded in trained emulator artifacts

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A centrality class given by its percentile edges `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CentralityBin {
    pub low: f64,
    pub high: f64,
}

impl CentralityBin {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Bin center, used as the x-coordinate for display and correlations.
    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

impl fmt::Display for CentralityBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}%", self.low, self.high)
    }
}

/// Collision system identifier, `"{projectile}-{target}-{energy}"`.
///
/// The string form is the join key across design files, emulator artifacts,
/// experimental data and the registry, so `Display` and `FromStr` round-trip
/// exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SystemId {
    projectile: String,
    target: String,
    sqrts: u32,
}

impl SystemId {
    pub fn new(projectile: impl Into<String>, target: impl Into<String>, sqrts: u32) -> Self {
        Self {
            projectile: projectile.into(),
            target: target.into(),
            sqrts,
        }
    }

    pub fn projectile(&self) -> &str {
        &self.projectile
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Collision energy per nucleon pair in GeV.
    pub fn sqrts(&self) -> u32 {
        self.sqrts
    }

    /// `(projectile, target, sqrts)`, for matching against known systems.
    pub fn key(&self) -> (&str, &str, u32) {
        (&self.projectile, &self.target, self.sqrts)
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.projectile, self.target, self.sqrts)
    }
}

impl FromStr for SystemId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        let [projectile, target, energy] = parts.as_slice() else {
            return Err(PipelineError::Config(format!(
                "invalid collision system '{s}' (expected e.g. Pb-Pb-2760)"
            )));
        };
        if projectile.is_empty() || target.is_empty() {
            return Err(PipelineError::Config(format!(
                "invalid collision system '{s}': empty nucleus name"
            )));
        }
        let sqrts = energy.parse::<u32>().map_err(|e| {
            PipelineError::Config(format!("invalid collision energy in '{s}': {e}"))
        })?;
        Ok(Self::new(*projectile, *target, sqrts))
    }
}

impl TryFrom<String> for SystemId {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SystemId> for String {
    fn from(value: SystemId) -> Self {
        value.to_string()
    }
}

/// Viscous correction (particlization) model used when converting the fluid
/// into hadrons. Each choice has its own trained emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Idf {
    /// 14-moment (Grad) ansatz.
    Grad,
    /// Chapman-Enskog, relaxation-time approximation.
    Ce,
    /// Pratt-McNelis.
    Pm,
    /// Pratt-Bernhard.
    Pb,
}

impl Idf {
    pub const ALL: [Idf; 4] = [Idf::Grad, Idf::Ce, Idf::Pm, Idf::Pb];

    /// Numeric index used in artifact file names (`…-idf-{index}`).
    pub fn index(self) -> usize {
        match self {
            Idf::Grad => 0,
            Idf::Ce => 1,
            Idf::Pm => 2,
            Idf::Pb => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Idf::Grad => "Grad",
            Idf::Ce => "Chapman-Enskog R.T.A",
            Idf::Pm => "Pratt-McNelis",
            Idf::Pb => "Pratt-Bernhard",
        }
    }

    /// Short label, also used in MAP observable paths.
    pub fn short_label(self) -> &'static str {
        match self {
            Idf::Grad => "Grad",
            Idf::Ce => "C.E.",
            Idf::Pm => "P.M.",
            Idf::Pb => "P.B.",
        }
    }
}

/// Which design point set to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PointSet {
    Main,
    Validation,
}

impl PointSet {
    pub fn as_str(self) -> &'static str {
        match self {
            PointSet::Main => "main",
            PointSet::Validation => "validation",
        }
    }
}

/// What the emulator is being compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Compare against experimental data (parameter estimation).
    Experiment,
    /// Use one independent validation design point as the query.
    Independent { point: usize },
    /// Omit a seeded fifth of the main design from the emulator design.
    CrossValidation,
}

/// How experimental uncertainties are treated before comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpErrorPolicy {
    /// Set every experimental error to zero.
    pub zero: bool,
    /// Per-observable multiplicative factors on the experimental error.
    pub scale: IndexMap<String, f64>,
}

impl ExpErrorPolicy {
    /// Apply the policy to one experimental error value.
    pub fn apply(&self, observable: &str, err: f64) -> f64 {
        if self.zero {
            return 0.0;
        }
        match self.scale.get(observable) {
            Some(factor) => err * factor,
            None => err,
        }
    }
}

/// A full run's analysis switches.
///
/// Threaded explicitly through the pipeline so that behavior is a pure
/// function of its inputs.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub idf: Idf,
    /// Feed the emulator η/s and ζ/s samples instead of raw shape parameters.
    pub transform_design: bool,
    pub validation: ValidationMode,
    /// `(parameter index, value)` pairs forced onto every query.
    pub hold_parameters: Vec<(usize, f64)>,
    pub exp_error: ExpErrorPolicy,
    /// Use a parameterized correlation between centrality bins of one observable.
    pub assume_corr_exp_error: bool,
    /// Correlation length in units of centrality fraction.
    pub cent_corr_length: f64,
    /// Seed for cross-validation hold-out selection.
    pub holdout_seed: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            idf: Idf::Ce,
            transform_design: true,
            validation: ValidationMode::Experiment,
            hold_parameters: Vec::new(),
            exp_error: ExpErrorPolicy::default(),
            assume_corr_exp_error: false,
            cent_corr_length: 0.5,
            holdout_seed: 1,
        }
    }
}
