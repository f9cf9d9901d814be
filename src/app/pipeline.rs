//! Shared pipeline logic behind the `hic` subcommands.
//!
//! Keeping this in one place keeps the command handlers down to presentation:
//! design load -> transform -> emulator query -> alignment -> likelihood.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::config::SystemSettings;
use crate::data::Registry;
use crate::data::params::{DELETE_VALIDATION_POINTS, N_PARAMS, map_params, parameter_label};
use crate::data::registry::{active_observables, display_observables};
use crate::domain::{AnalysisConfig, PointSet, ValidationMode};
use crate::emulator::{Emulator, PredictionBundle};
use crate::error::PipelineError;
use crate::io::design::{DesignTable, load_design, load_labels, load_ranges};
use crate::io::experiment::ExpData;
use crate::recombine::{AlignedObservable, align, log_likelihood};
use crate::transform::{ViscosityPoint, column_ranges, feature_labels, transform_design, transform_labeled, viscosity_table};

/// A design ready to be handed to the emulator.
#[derive(Debug, Clone)]
pub struct PreparedDesign {
    pub pset: PointSet,
    /// Column labels of `rows` (feature labels when transformed).
    pub labels: Vec<String>,
    pub idx: Vec<usize>,
    pub rows: Vec<Vec<f64>>,
    /// Per-column `(min, max)` of `rows`.
    pub ranges: Vec<(f64, f64)>,
    pub removed: Vec<usize>,
    pub transformed: bool,
    /// Prior `(min, max)` of the raw parameters, from the range file.
    pub bounds: Option<Vec<(f64, f64)>>,
}

/// Design points omitted from the emulator design under cross-validation:
/// `n / 5` distinct indices in `0..n`, chosen with a seeded RNG (sorted).
pub fn cross_validation_holdout(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = rand::seq::index::sample(&mut rng, n, n / 5).into_vec();
    out.sort_unstable();
    out
}

/// Design indices removed from a point set under the given analysis mode.
pub fn removed_points(settings: &SystemSettings, config: &AnalysisConfig, pset: PointSet) -> Vec<usize> {
    match (pset, config.validation) {
        (PointSet::Main, ValidationMode::CrossValidation) => {
            cross_validation_holdout(settings.n_design(), config.holdout_seed)
        }
        (PointSet::Main, _) => settings.design_remove_idx().to_vec(),
        (PointSet::Validation, _) => DELETE_VALIDATION_POINTS.to_vec(),
    }
}

/// Prior bounds of the 17 raw parameters for a point set.
///
/// A missing range file is logged and yields `None`; a file with the wrong
/// number of rows is a `Shape` error.
pub fn load_parameter_bounds(
    settings: &SystemSettings,
    pset: PointSet,
) -> Result<Option<Vec<(f64, f64)>>, PipelineError> {
    let path = settings.range_file(pset);
    if !path.exists() {
        warn!(path = %path.display(), "design range file not found; parameters are not bounds-checked");
        return Ok(None);
    }
    let ranges = load_ranges(&path)?;
    if ranges.len() != N_PARAMS {
        return Err(PipelineError::Shape(format!(
            "range file {} has {} rows, expected {N_PARAMS}",
            path.display(),
            ranges.len()
        )));
    }
    Ok(Some(ranges))
}

/// Reject overrides that fall outside the prior bounds.
pub fn check_overrides(overrides: &[(usize, f64)], bounds: &[(f64, f64)]) -> Result<(), PipelineError> {
    for &(idx, value) in overrides {
        let Some(&(lo, hi)) = bounds.get(idx) else {
            return Err(PipelineError::Config(format!(
                "parameter index {idx} out of range (0..{N_PARAMS})"
            )));
        };
        if !(lo..=hi).contains(&value) {
            return Err(PipelineError::Range(format!(
                "{} = {value} is outside the design range [{lo}, {hi}]",
                parameter_label(idx).unwrap_or("?")
            )));
        }
    }
    Ok(())
}

fn checked_overrides(settings: &SystemSettings, overrides: &[(usize, f64)]) -> Result<(), PipelineError> {
    if overrides.is_empty() {
        return Ok(());
    }
    match load_parameter_bounds(settings, PointSet::Main)? {
        Some(bounds) => check_overrides(overrides, &bounds),
        None => Ok(()),
    }
}

/// Load a design point set, drop removed points and transform it if enabled.
///
/// With a label file present the transform locates columns by label;
/// otherwise the positional column contract is assumed.
pub fn prepare_design(
    settings: &SystemSettings,
    config: &AnalysisConfig,
    pset: PointSet,
) -> Result<PreparedDesign, PipelineError> {
    let table = load_design(&settings.design_file(pset))?;
    let labels = load_labels(&settings.labels_file())?;
    let removed = removed_points(settings, config, pset);
    let kept = table.without_points(&removed);
    info!(
        system = %settings.system(),
        pset = pset.as_str(),
        loaded = table.n_points(),
        kept = kept.n_points(),
        "design loaded"
    );

    let DesignTable { labels: header, idx, rows } = kept;
    let (labels, rows) = if config.transform_design {
        let rows = match &labels {
            Some(labels) => transform_labeled(labels, &rows)?,
            None => transform_design(&rows)?,
        };
        (feature_labels(), rows)
    } else {
        (labels.unwrap_or(header), rows)
    };

    let bounds = load_parameter_bounds(settings, pset)?;

    Ok(PreparedDesign {
        pset,
        ranges: column_ranges(&rows),
        bounds,
        labels,
        idx,
        rows,
        removed,
        transformed: config.transform_design,
    })
}

/// The main design as used to build the emulator.
pub fn prepare_emulator_design(
    settings: &SystemSettings,
    config: &AnalysisConfig,
) -> Result<PreparedDesign, PipelineError> {
    prepare_design(settings, config, PointSet::Main)
}

/// Apply `index = value` overrides to a parameter vector.
pub fn apply_overrides(params: &mut [f64], overrides: &[(usize, f64)]) -> Result<(), PipelineError> {
    for &(idx, value) in overrides {
        let slot = params.get_mut(idx).ok_or_else(|| {
            PipelineError::Config(format!("parameter index {idx} out of range (0..{N_PARAMS})"))
        })?;
        *slot = value;
    }
    Ok(())
}

/// MAP parameters of the configured model with overrides applied.
///
/// Overrides must lie inside the design ranges when a range file exists.
pub fn map_query(
    settings: &SystemSettings,
    config: &AnalysisConfig,
    overrides: &[(usize, f64)],
) -> Result<Vec<f64>, PipelineError> {
    checked_overrides(settings, overrides)?;
    let mut params = map_params(settings.system(), config.idf)?.to_vec();
    apply_overrides(&mut params, overrides)?;
    Ok(params)
}

/// Raw parameter rows to query, depending on the validation mode.
///
/// - experiment: the MAP point (with overrides)
/// - independent validation: the chosen validation design point
/// - cross-validation: every held-out main design point
pub fn query_rows(
    settings: &SystemSettings,
    config: &AnalysisConfig,
    overrides: &[(usize, f64)],
) -> Result<Vec<Vec<f64>>, PipelineError> {
    match config.validation {
        ValidationMode::Experiment => Ok(vec![map_query(settings, config, overrides)?]),
        ValidationMode::Independent { point } => {
            if point >= settings.n_validation() {
                return Err(PipelineError::Config(format!(
                    "validation point {point} out of range (0..{})",
                    settings.n_validation()
                )));
            }
            checked_overrides(settings, overrides)?;
            let table = load_design(&settings.design_file(PointSet::Validation))?;
            let pos = table.idx.iter().position(|&i| i == point).ok_or_else(|| {
                PipelineError::Config(format!("validation design has no point {point}"))
            })?;
            let mut row = table.rows[pos].clone();
            apply_overrides(&mut row, overrides)?;
            Ok(vec![row])
        }
        ValidationMode::CrossValidation => {
            checked_overrides(settings, overrides)?;
            let holdout = cross_validation_holdout(settings.n_design(), config.holdout_seed);
            let table = load_design(&settings.design_file(PointSet::Main))?;
            let mut rows: Vec<Vec<f64>> = table
                .idx
                .iter()
                .zip(&table.rows)
                .filter(|(i, _)| holdout.binary_search(i).is_ok())
                .map(|(_, r)| r.clone())
                .collect();
            if rows.is_empty() {
                return Err(PipelineError::Config("no held-out design points found".to_string()));
            }
            for row in &mut rows {
                apply_overrides(row, overrides)?;
            }
            Ok(rows)
        }
    }
}

/// Query point and tabulated transport coefficients of a `hic viscosity` run.
#[derive(Debug, Clone)]
pub struct ViscosityRun {
    pub params: Vec<f64>,
    pub table: Vec<ViscosityPoint>,
}

/// η/s, ζ/s and τ_π of the MAP point (with overrides) on the display range.
pub fn run_viscosity(
    settings: &SystemSettings,
    config: &AnalysisConfig,
    overrides: &[(usize, f64)],
    t_low: f64,
    t_high: f64,
    points: usize,
) -> Result<ViscosityRun, PipelineError> {
    let params = map_query(settings, config, overrides)?;
    let table = viscosity_table(&params, t_low, t_high, points)?;
    Ok(ViscosityRun { params, table })
}

/// All computed outputs of a single `hic predict` run.
#[derive(Debug, Clone)]
pub struct PredictRun {
    /// Query rows after held parameters were applied.
    pub params: Vec<Vec<f64>>,
    pub bundle: PredictionBundle,
    pub aligned: Vec<AlignedObservable>,
    /// Observables that entered the likelihood.
    pub likelihood_observables: Vec<String>,
    /// One value per query, when experimental data was supplied.
    pub log_likelihood: Option<Vec<f64>>,
}

/// Observables shown for a system: the display list when the emulator covers
/// it, otherwise everything the emulator emits.
pub fn shown_observables(emulator: &Emulator) -> Vec<String> {
    let emitted: Vec<&str> = emulator.observables().map(|(name, _)| name).collect();
    match display_observables(emulator.system()) {
        Some(display) if display.iter().all(|d| emitted.contains(d)) => {
            display.iter().map(|d| d.to_string()).collect()
        }
        _ => emitted.into_iter().map(str::to_string).collect(),
    }
}

/// Query the emulator, align the result and evaluate the likelihood.
pub fn run_predict(
    emulator: &Emulator,
    registry: &Registry,
    config: &AnalysisConfig,
    params: &[Vec<f64>],
    exp: Option<&ExpData>,
) -> Result<PredictRun, PipelineError> {
    if emulator.idf() != config.idf {
        return Err(PipelineError::Config(format!(
            "emulator was trained for {}, analysis uses {}",
            emulator.idf().short_label(),
            config.idf.short_label()
        )));
    }
    let system = emulator.system();

    let mut held = params.to_vec();
    for row in &mut held {
        apply_overrides(row, &config.hold_parameters)?;
    }
    for &(idx, value) in &config.hold_parameters {
        info!(parameter = parameter_label(idx).unwrap_or("?"), value, "holding parameter");
    }

    let bundle = emulator.predict_held(params, &config.hold_parameters)?;
    let shown = shown_observables(emulator);
    let aligned = align(&bundle, registry, system, &shown, exp.map(|e| (e, config.idf)))?;

    let (likelihood_observables, log_likelihood) = match exp {
        Some(data) => {
            let candidates = active_observables(system)
                .unwrap_or_else(|| emulator.observables().map(|(n, _)| n.to_string()).collect());
            let used: Vec<String> = candidates
                .into_iter()
                .filter(|name| bundle.n_bins(name).is_ok() && data.get(name, config.idf).is_some())
                .collect();
            if used.is_empty() {
                warn!(system = %system, "no experimental data overlaps the likelihood observables");
                (used, None)
            } else {
                let values = (0..bundle.n_queries())
                    .map(|q| log_likelihood(&bundle, registry, &used, data, config, q))
                    .collect::<Result<Vec<_>, _>>()?;
                (used, Some(values))
            }
        }
        None => (Vec::new(), None),
    };

    Ok(PredictRun {
        params: held,
        bundle,
        aligned,
        likelihood_observables,
        log_likelihood,
    })
}
