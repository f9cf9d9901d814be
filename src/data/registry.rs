//! Observable / centrality registry.
//!
//! Maps `(system, observable)` to the ordered centrality bins the observable is
//! measured (and emulated) in. The registry fixes the array layout of every
//! downstream stage, so:
//!
//! - observables iterate in insertion order
//! - bins keep their physical order (central → peripheral)
//! - nothing can be mutated after `build()`

use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::domain::{CentralityBin, SystemId};
use crate::error::PipelineError;

/// STAR bins: 9 classes out to 80%.
pub const STAR_CENT_BINS: &[(f64, f64)] = &[
    (0.0, 5.0),
    (5.0, 10.0),
    (10.0, 20.0),
    (20.0, 30.0),
    (30.0, 40.0),
    (40.0, 50.0),
    (50.0, 60.0),
    (60.0, 70.0),
    (70.0, 80.0),
];

/// Central STAR bins used for estimation (avoids near-empty peripheral events).
pub const CENTRAL_STAR_CENT_BINS: &[(f64, f64)] = &[
    (0.0, 5.0),
    (5.0, 10.0),
    (10.0, 20.0),
    (20.0, 30.0),
    (30.0, 40.0),
    (40.0, 50.0),
];

/// Central PHENIX bins.
pub const CENTRAL_PHENIX_CENT_BINS: &[(f64, f64)] = &[
    (0.0, 5.0),
    (5.0, 10.0),
    (10.0, 15.0),
    (15.0, 20.0),
    (20.0, 30.0),
    (30.0, 40.0),
    (40.0, 50.0),
];

/// Bins shared by most ALICE observables.
pub const ALICE_CENT_BINS: &[(f64, f64)] = &[
    (0.0, 5.0),
    (5.0, 10.0),
    (10.0, 20.0),
    (20.0, 30.0),
    (30.0, 40.0),
    (40.0, 50.0),
    (50.0, 60.0),
    (60.0, 70.0),
];

const ALICE_FINE_CENTRAL_BINS: &[(f64, f64)] = &[
    (0.0, 2.5),
    (2.5, 5.0),
    (5.0, 7.5),
    (7.5, 10.0),
    (10.0, 20.0),
    (20.0, 30.0),
    (30.0, 40.0),
    (40.0, 50.0),
    (50.0, 60.0),
    (60.0, 70.0),
];

const DET_DETA_BINS: &[(f64, f64)] = &[
    (0.0, 2.5),
    (2.5, 5.0),
    (5.0, 7.5),
    (7.5, 10.0),
    (10.0, 12.5),
    (12.5, 15.0),
    (15.0, 17.5),
    (17.5, 20.0),
    (20.0, 22.5),
    (22.5, 25.0),
    (25.0, 27.5),
    (27.5, 30.0),
    (30.0, 32.5),
    (32.5, 35.0),
    (35.0, 37.5),
    (37.5, 40.0),
    (40.0, 45.0),
    (45.0, 50.0),
    (50.0, 55.0),
    (55.0, 60.0),
    (60.0, 65.0),
    (65.0, 70.0),
];

const LAMBDA_BINS: &[(f64, f64)] = &[(0.0, 5.0), (5.0, 10.0), (10.0, 20.0), (20.0, 40.0), (40.0, 60.0)];

const STRANGE_BINS: &[(f64, f64)] = &[(0.0, 10.0), (10.0, 20.0), (20.0, 40.0), (40.0, 60.0)];

const PT_FLUCT_BINS: &[(f64, f64)] = &[
    (0.0, 5.0),
    (5.0, 10.0),
    (10.0, 15.0),
    (15.0, 20.0),
    (20.0, 25.0),
    (25.0, 30.0),
    (30.0, 35.0),
    (35.0, 40.0),
    (40.0, 45.0),
    (45.0, 50.0),
    (50.0, 55.0),
    (55.0, 60.0),
];

const FLOW_HIGHER_BINS: &[(f64, f64)] = CENTRAL_STAR_CENT_BINS;

/// Energy-momentum tensor observables all use the ALICE bins.
const TMUNU_CENTS: &[(f64, f64)] = ALICE_CENT_BINS;

/// Observables shown per system in the interactive widget.
const PB_PB_2760_DISPLAY: &[&str] = &[
    "dET_deta",
    "dN_dy_pion",
    "dN_dy_proton",
    "mean_pT_pion",
    "mean_pT_proton",
    "pT_fluct",
    "v22",
    "v32",
    "v42",
];

const AU_AU_200_DISPLAY: &[&str] = &[
    "dN_dy_pion",
    "dN_dy_kaon",
    "mean_pT_pion",
    "mean_pT_kaon",
    "v22",
    "v32",
];

/// Immutable `(system, observable) → bins` table.
#[derive(Debug, Clone)]
pub struct Registry {
    systems: IndexMap<SystemId, IndexMap<String, Vec<CentralityBin>>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Production tables for all supported systems.
    pub fn standard() -> Result<&'static Registry, PipelineError> {
        static STANDARD: OnceLock<Result<Registry, PipelineError>> = OnceLock::new();
        STANDARD.get_or_init(build_standard).as_ref().map_err(Clone::clone)
    }

    /// The subset of Pb-Pb-2760 observables used for calibration.
    pub fn calibration() -> Result<&'static Registry, PipelineError> {
        static CALIBRATION: OnceLock<Result<Registry, PipelineError>> = OnceLock::new();
        CALIBRATION
            .get_or_init(build_calibration)
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Ordered bins for one observable.
    pub fn bins_for(&self, system: &SystemId, observable: &str) -> Result<&[CentralityBin], PipelineError> {
        self.systems
            .get(system)
            .and_then(|obs| obs.get(observable))
            .map(Vec::as_slice)
            .ok_or_else(|| PipelineError::unknown_key(system.to_string(), observable))
    }

    /// All observables of a system, in registration order.
    pub fn observables(
        &self,
        system: &SystemId,
    ) -> Result<impl Iterator<Item = (&str, &[CentralityBin])>, PipelineError> {
        let table = self
            .systems
            .get(system)
            .ok_or_else(|| PipelineError::unknown_key(system.to_string(), "*"))?;
        Ok(table.iter().map(|(name, bins)| (name.as_str(), bins.as_slice())))
    }

    pub fn observable_names(&self, system: &SystemId) -> Result<Vec<&str>, PipelineError> {
        Ok(self.observables(system)?.map(|(name, _)| name).collect())
    }

    pub fn systems(&self) -> impl Iterator<Item = &SystemId> {
        self.systems.keys()
    }

    pub fn contains(&self, system: &SystemId, observable: &str) -> bool {
        self.systems
            .get(system)
            .is_some_and(|obs| obs.contains_key(observable))
    }
}

/// Collects registry entries; all validation happens in `build()`.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    systems: IndexMap<SystemId, IndexMap<String, Vec<CentralityBin>>>,
    error: Option<PipelineError>,
}

impl RegistryBuilder {
    pub fn observable(mut self, system: &SystemId, name: &str, bins: &[(f64, f64)]) -> Self {
        if self.error.is_some() {
            return self;
        }
        let bins: Vec<CentralityBin> = bins.iter().map(|&(lo, hi)| CentralityBin::new(lo, hi)).collect();
        if let Err(e) = validate_bins(system, name, &bins) {
            self.error = Some(e);
            return self;
        }
        let table = self.systems.entry(system.clone()).or_default();
        if table.insert(name.to_string(), bins).is_some() {
            self.error = Some(PipelineError::Config(format!(
                "observable '{name}' registered twice for {system}"
            )));
        }
        self
    }

    pub fn build(self) -> Result<Registry, PipelineError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(Registry { systems: self.systems }),
        }
    }
}

fn validate_bins(system: &SystemId, name: &str, bins: &[CentralityBin]) -> Result<(), PipelineError> {
    if bins.is_empty() {
        return Err(PipelineError::Config(format!("{system}/{name}: no centrality bins")));
    }
    for (i, bin) in bins.iter().enumerate() {
        if !(bin.low.is_finite() && bin.high.is_finite() && bin.low < bin.high) {
            return Err(PipelineError::Config(format!(
                "{system}/{name}: invalid centrality bin {bin}"
            )));
        }
        if bins[..i].contains(bin) {
            return Err(PipelineError::Config(format!(
                "{system}/{name}: duplicate centrality bin {bin}"
            )));
        }
    }
    Ok(())
}

/// Names of the energy-momentum tensor cumulant observables, `Tmunu_cums_i_j_k`.
fn tmunu_cumulant_names() -> Vec<String> {
    let mut out = Vec::with_capacity(27);
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                out.push(format!("Tmunu_cums_{i}_{j}_{k}"));
            }
        }
    }
    out
}

fn with_tmunu(mut builder: RegistryBuilder, system: &SystemId, moments: bool) -> RegistryBuilder {
    if moments {
        for i in 0..10 {
            builder = builder.observable(system, &format!("Tmunu{i}"), TMUNU_CENTS);
        }
    } else {
        builder = builder.observable(system, "Tmunu0", TMUNU_CENTS);
    }
    for name in ["Tmunu_A", "Tmunu_00_00", "Tmunu_0i_0i", "Tmunu_ij_ij", "Tmunu_tr"] {
        builder = builder.observable(system, name, TMUNU_CENTS);
    }
    for name in tmunu_cumulant_names() {
        builder = builder.observable(system, &name, TMUNU_CENTS);
    }
    builder
}

pub fn pb_pb_2760() -> SystemId {
    SystemId::new("Pb", "Pb", 2760)
}

pub fn pb_pb_5020() -> SystemId {
    SystemId::new("Pb", "Pb", 5020)
}

pub fn xe_xe_5440() -> SystemId {
    SystemId::new("Xe", "Xe", 5440)
}

pub fn au_au_200() -> SystemId {
    SystemId::new("Au", "Au", 200)
}

fn build_standard() -> Result<Registry, PipelineError> {
    let pb2760 = pb_pb_2760();
    let pb5020 = pb_pb_5020();
    let xe = xe_xe_5440();
    let au = au_au_200();

    let builder = Registry::builder()
        .observable(&pb2760, "dNch_deta", ALICE_CENT_BINS)
        .observable(&pb2760, "dET_deta", DET_DETA_BINS)
        .observable(&pb2760, "dN_dy_pion", ALICE_CENT_BINS)
        .observable(&pb2760, "dN_dy_kaon", ALICE_CENT_BINS)
        .observable(&pb2760, "dN_dy_proton", ALICE_CENT_BINS)
        .observable(&pb2760, "dN_dy_Lambda", LAMBDA_BINS)
        .observable(&pb2760, "dN_dy_Omega", STRANGE_BINS)
        .observable(&pb2760, "dN_dy_Xi", STRANGE_BINS)
        .observable(&pb2760, "mean_pT_pion", ALICE_CENT_BINS)
        .observable(&pb2760, "mean_pT_kaon", ALICE_CENT_BINS)
        .observable(&pb2760, "mean_pT_proton", ALICE_CENT_BINS)
        .observable(&pb2760, "pT_fluct", PT_FLUCT_BINS)
        .observable(&pb2760, "v22", ALICE_CENT_BINS)
        .observable(&pb2760, "v32", FLOW_HIGHER_BINS)
        .observable(&pb2760, "v42", FLOW_HIGHER_BINS);
    let builder = with_tmunu(builder, &pb2760, true);

    builder
        .observable(&pb5020, "dNch_deta", ALICE_FINE_CENTRAL_BINS)
        .observable(&pb5020, "dN_dy_pion", ALICE_CENT_BINS)
        .observable(&pb5020, "dN_dy_kaon", ALICE_CENT_BINS)
        .observable(&pb5020, "dN_dy_proton", ALICE_CENT_BINS)
        .observable(&pb5020, "dN_dy_d", STRANGE_BINS)
        .observable(&pb5020, "mean_pT_pion", ALICE_CENT_BINS)
        .observable(&pb5020, "mean_pT_kaon", ALICE_CENT_BINS)
        .observable(&pb5020, "mean_pT_proton", ALICE_CENT_BINS)
        .observable(&pb5020, "mean_pT_d", STRANGE_BINS)
        .observable(&pb5020, "v22", ALICE_CENT_BINS)
        .observable(&pb5020, "v32", FLOW_HIGHER_BINS)
        .observable(&pb5020, "v42", FLOW_HIGHER_BINS)
        .observable(&xe, "dNch_deta", ALICE_FINE_CENTRAL_BINS)
        .observable(&xe, "v22", ALICE_CENT_BINS)
        .observable(&xe, "v32", ALICE_CENT_BINS)
        .observable(&au, "dN_dy_pion", CENTRAL_STAR_CENT_BINS)
        .observable(&au, "dN_dy_kaon", CENTRAL_STAR_CENT_BINS)
        // Model calculations use STAR bins; PHENIX protons would need re-averaging.
        .observable(&au, "dN_dy_proton", CENTRAL_STAR_CENT_BINS)
        .observable(&au, "mean_pT_pion", CENTRAL_STAR_CENT_BINS)
        .observable(&au, "mean_pT_kaon", CENTRAL_STAR_CENT_BINS)
        .observable(&au, "mean_pT_proton", CENTRAL_STAR_CENT_BINS)
        .observable(&au, "v22", CENTRAL_STAR_CENT_BINS)
        .observable(&au, "v32", CENTRAL_STAR_CENT_BINS)
        .build()
}

fn build_calibration() -> Result<Registry, PipelineError> {
    let pb2760 = pb_pb_2760();
    with_tmunu(Registry::builder(), &pb2760, false).build()
}

/// Observables displayed for a system (falls back to everything registered).
pub fn display_observables(system: &SystemId) -> Option<&'static [&'static str]> {
    match system.key() {
        ("Pb", "Pb", 2760) => Some(PB_PB_2760_DISPLAY),
        ("Au", "Au", 200) => Some(AU_AU_200_DISPLAY),
        _ => None,
    }
}

/// Observables entering the calibration likelihood for a system, if restricted.
pub fn active_observables(system: &SystemId) -> Option<Vec<String>> {
    if *system != pb_pb_2760() {
        return None;
    }
    let mut out = vec!["Tmunu0".to_string(), "Tmunu_A".to_string(), "Tmunu_tr".to_string()];
    out.extend(
        tmunu_cumulant_names()
            .into_iter()
            .filter(|name| name != "Tmunu_cums_0_0_0"),
    );
    Some(out)
}

/// Collaboration whose measurements are used for a system.
pub fn experiment_for(system: &SystemId) -> Option<&'static str> {
    match system.key() {
        ("Au", "Au", 200) => Some("STAR"),
        ("Pb", "Pb", 2760 | 5020) | ("Xe", "Xe", 5440) => Some("ALICE"),
        _ => None,
    }
}
