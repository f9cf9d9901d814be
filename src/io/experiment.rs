//! Experimental measurements.
//!
//! CSV layout, one row per centrality bin:
//!
//! ```text
//! observable,idf,cent_low,cent_high,mean,err
//! dNch_deta,0,0,5,1601,60
//! ```
//!
//! Rows are kept in file order within each `(observable, idf)` pair. For
//! Au-Au-200, STAR publishes positive-charge yields (`dN_dy_pion_+`, ...);
//! these are renamed to the charge-summed observable and doubled.

use std::fs::File;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::data::registry::au_au_200;
use crate::domain::{CentralityBin, Idf, SystemId};
use crate::error::PipelineError;

/// STAR single-charge yields and the observable they stand for.
const STAR_ID_YIELDS: [(&str, &str); 3] = [
    ("dN_dy_pion_+", "dN_dy_pion"),
    ("dN_dy_kaon_+", "dN_dy_kaon"),
    ("dN_dy_proton_+", "dN_dy_proton"),
];

/// One measured observable: bins with mean and uncertainty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpObservable {
    pub bins: Vec<CentralityBin>,
    pub mean: Vec<f64>,
    pub err: Vec<f64>,
}

impl ExpObservable {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    fn push(&mut self, bin: CentralityBin, mean: f64, err: f64) {
        self.bins.push(bin);
        self.mean.push(mean);
        self.err.push(err);
    }
}

/// Measurements for one collision system keyed by `(observable, idf)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpData {
    system: SystemId,
    entries: IndexMap<(String, Idf), ExpObservable>,
}

#[derive(Debug, Deserialize)]
struct ExpRecord {
    observable: String,
    idf: String,
    cent_low: f64,
    cent_high: f64,
    mean: f64,
    err: f64,
}

impl ExpData {
    pub fn new(system: SystemId) -> Self {
        Self {
            system,
            entries: IndexMap::new(),
        }
    }

    pub fn system(&self) -> &SystemId {
        &self.system
    }

    /// Add (or replace) one observable's measurements.
    pub fn insert(&mut self, observable: impl Into<String>, idf: Idf, data: ExpObservable) {
        self.entries.insert((observable.into(), idf), data);
    }

    pub fn get(&self, observable: &str, idf: Idf) -> Option<&ExpObservable> {
        self.entries.get(&(observable.to_string(), idf))
    }

    /// Distinct observable names, in file order.
    pub fn observables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for (name, _) in self.entries.keys() {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        out
    }

    /// Load measurements for `system` from CSV.
    pub fn load(path: &Path, system: &SystemId) -> Result<Self, PipelineError> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

        let star = *system == au_au_200();
        let mut data = Self::new(system.clone());
        for (n, result) in reader.deserialize::<ExpRecord>().enumerate() {
            let line = n + 2;
            let rec = result.map_err(|e| PipelineError::parse(path, format!("line {line}: {e}")))?;
            let idf = parse_idf(&rec.idf)
                .ok_or_else(|| PipelineError::parse(path, format!("line {line}: unknown idf '{}'", rec.idf)))?;
            if rec.cent_low >= rec.cent_high {
                return Err(PipelineError::parse(
                    path,
                    format!("line {line}: empty centrality bin {}-{}", rec.cent_low, rec.cent_high),
                ));
            }

            let (name, factor) = match STAR_ID_YIELDS.iter().find(|(plus, _)| *plus == rec.observable) {
                Some((_, summed)) if star => (summed.to_string(), 2.0),
                _ => (rec.observable, 1.0),
            };
            data.entries.entry((name, idf)).or_default().push(
                CentralityBin::new(rec.cent_low, rec.cent_high),
                factor * rec.mean,
                factor * rec.err,
            );
        }

        debug!(path = %path.display(), system = %system, entries = data.entries.len(), "experimental data loaded");
        Ok(data)
    }
}

/// Accepts either the numeric index (`0`..`3`) or the short name (`grad`, `ce`, `pm`, `pb`).
fn parse_idf(s: &str) -> Option<Idf> {
    if let Ok(index) = s.parse::<usize>() {
        return Idf::from_index(index);
    }
    match s.to_ascii_lowercase().as_str() {
        "grad" => Some(Idf::Grad),
        "ce" | "c.e." => Some(Idf::Ce),
        "pm" | "p.m." => Some(Idf::Pm),
        "pb" | "p.b." => Some(Idf::Pb),
        _ => None,
    }
}
