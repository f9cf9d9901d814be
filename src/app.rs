//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - turns arguments into `AnalysisConfig` + `SystemSettings`
//! - runs the pipeline for the chosen subcommand
//! - prints reports and writes optional exports

use std::path::Path;

use clap::Parser;
use tracing::{info, warn};

use crate::cli::{Cli, Command, HoldoutArgs, PredictArgs, SettingsArgs, SystemArgs, TransformArgs, ViscosityArgs};
use crate::config::{SystemSettings, workdir_from_env};
use crate::data::Registry;
use crate::data::registry::experiment_for;
use crate::data::params::VALIDATION_HOLD_SET;
use crate::domain::{AnalysisConfig, ExpErrorPolicy, PointSet, ValidationMode};
use crate::emulator::EmulatorHandle;
use crate::error::AppError;
use crate::io::experiment::ExpData;
use crate::io::prediction::{PredictionFile, write_prediction_json};

pub mod pipeline;

/// Entry point for the `hic` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let _ = tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Command::Bins(args) => {
            let registry = if args.calibration {
                Registry::calibration()?
            } else {
                Registry::standard()?
            };
            print!("{}", crate::report::format_bins(registry, &args.system)?);
            Ok(())
        }
        Command::Settings(SettingsArgs { sys }) => {
            print!("{}", crate::report::format_settings(&settings_from_args(&sys)));
            Ok(())
        }
        Command::Transform(args) => handle_transform(args),
        Command::Viscosity(args) => handle_viscosity(args),
        Command::Predict(args) => handle_predict(args),
        Command::Holdout(args) => handle_holdout(args),
    }
}

/// Production settings where they exist, plain defaults otherwise.
fn settings_from_args(args: &SystemArgs) -> SystemSettings {
    let workdir = args.workdir.clone().unwrap_or_else(workdir_from_env);
    let settings = SystemSettings::production(&workdir, args.system.clone(), args.idf)
        .unwrap_or_else(|_| SystemSettings::new(&workdir, args.system.clone(), args.idf));
    match &args.run_id {
        Some(run_id) => settings.with_run_id(run_id.as_str()),
        None => settings,
    }
}

pub fn analysis_config_from_args(args: &PredictArgs) -> AnalysisConfig {
    let validation = if args.crossvalidation {
        ValidationMode::CrossValidation
    } else if let Some(point) = args.validation_point {
        ValidationMode::Independent { point }
    } else {
        ValidationMode::Experiment
    };

    AnalysisConfig {
        idf: args.sys.idf,
        validation,
        hold_parameters: if args.hold { VALIDATION_HOLD_SET.to_vec() } else { Vec::new() },
        exp_error: ExpErrorPolicy {
            zero: args.zero_exp_error,
            scale: args.scale_exp_error.iter().cloned().collect(),
        },
        assume_corr_exp_error: args.corr_exp_error,
        cent_corr_length: args.cent_corr_length,
        holdout_seed: args.seed,
        ..AnalysisConfig::default()
    }
}

fn handle_transform(args: TransformArgs) -> Result<(), AppError> {
    let settings = settings_from_args(&args.sys);
    let config = AnalysisConfig {
        idf: args.sys.idf,
        transform_design: !args.no_transform,
        validation: if args.crossvalidation {
            ValidationMode::CrossValidation
        } else {
            ValidationMode::Experiment
        },
        holdout_seed: args.seed,
        ..AnalysisConfig::default()
    };

    let design = pipeline::prepare_design(&settings, &config, args.pset)?;
    print!("{}", crate::report::format_design_summary(settings.system(), &design));

    if let Some(path) = &args.export {
        crate::io::export::write_design_csv(path, &design.labels, &design.idx, &design.rows)?;
        info!(path = %path.display(), "design exported");
    }
    Ok(())
}

fn handle_viscosity(args: ViscosityArgs) -> Result<(), AppError> {
    let settings = settings_from_args(&args.sys);
    let config = AnalysisConfig {
        idf: args.sys.idf,
        ..AnalysisConfig::default()
    };
    let run = pipeline::run_viscosity(&settings, &config, &args.params, args.t_low, args.t_high, args.points)?;
    let bounds = pipeline::load_parameter_bounds(&settings, PointSet::Main)?;
    println!("=== hic - viscosity ({}, {}) ===", settings.system(), config.idf.label());
    print!("{}", crate::report::format_parameters(&run.params, bounds.as_deref()));
    println!();
    print!("{}", crate::report::format_viscosity(&run.table));
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let settings = settings_from_args(&args.sys);
    let config = analysis_config_from_args(&args);
    let registry = Registry::standard()?;

    let path = args
        .emulator
        .clone()
        .unwrap_or_else(|| settings.emulator_file().to_path_buf());
    let handle = EmulatorHandle::new(path);
    let emulator = handle.load()?;
    if emulator.system() != settings.system() {
        return Err(AppError::new(
            2,
            format!(
                "emulator at '{}' is for {}, not {}",
                handle.path().display(),
                emulator.system(),
                settings.system()
            ),
        ));
    }
    if emulator.n_components() != settings.npc() {
        warn!(
            emulator = emulator.n_components(),
            configured = settings.npc(),
            "emulator principal component count differs from the run settings"
        );
    }

    let exp = args
        .exp
        .as_deref()
        .map(|p| ExpData::load(p, settings.system()))
        .transpose()?;

    let params = pipeline::query_rows(&settings, &config, &args.params)?;
    let bounds = pipeline::load_parameter_bounds(&settings, PointSet::Main)?;
    let run = pipeline::run_predict(&emulator, registry, &config, &params, exp.as_ref())?;

    println!(
        "=== hic - prediction for {} ({}, {} queries) ===",
        settings.system(),
        config.idf.label(),
        run.params.len()
    );
    if exp.is_some() {
        println!("Experiment: {}", experiment_for(settings.system()).unwrap_or("-"));
    }
    for (q, row) in run.params.iter().enumerate() {
        if run.params.len() > 1 {
            println!("--- query {q} ---");
        }
        print!("{}", crate::report::format_parameters(row, bounds.as_deref()));
        println!();
        print!("{}", crate::report::format_predictions(&run.aligned, q));
    }
    if let Some(values) = &run.log_likelihood {
        print!("{}", crate::report::format_likelihood(&run.likelihood_observables, values));
    }

    if let Some(path) = &args.export {
        crate::io::export::write_prediction_csv(path, &run.aligned)?;
    }
    if let Some(path) = &args.export_json {
        write_json(path, &settings, &emulator, &run)?;
    }
    Ok(())
}

fn write_json(
    path: &Path,
    settings: &SystemSettings,
    emulator: &crate::emulator::Emulator,
    run: &pipeline::PredictRun,
) -> Result<(), AppError> {
    let mut file = PredictionFile::new(
        settings.system(),
        emulator.idf(),
        emulator.transforms_design(),
        &run.params,
        &run.aligned,
    );
    if let Some(values) = &run.log_likelihood {
        file = file.with_log_likelihood(values);
    }
    write_prediction_json(path, &file)?;
    Ok(())
}

fn handle_holdout(args: HoldoutArgs) -> Result<(), AppError> {
    let settings = settings_from_args(&args.sys);
    let holdout = pipeline::cross_validation_holdout(settings.n_design(), args.seed);
    println!(
        "{} of {} design points held out for {} (seed {}):",
        holdout.len(),
        settings.n_design(),
        settings.system(),
        args.seed
    );
    let parts: Vec<String> = holdout.iter().map(ToString::to_string).collect();
    println!("{}", parts.join(" "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_flags_become_analysis_config() {
        let cli = Cli::try_parse_from([
            "hic",
            "predict",
            "--idf",
            "pb",
            "--hold",
            "--validation-point",
            "3",
            "--zero-exp-error",
            "--corr-exp-error",
        ])
        .unwrap();
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        let config = analysis_config_from_args(&args);
        assert_eq!(config.idf, crate::domain::Idf::Pb);
        assert_eq!(config.validation, ValidationMode::Independent { point: 3 });
        assert_eq!(config.hold_parameters, VALIDATION_HOLD_SET.to_vec());
        assert!(config.exp_error.zero);
        assert!(config.assume_corr_exp_error);
        assert!(config.transform_design);
        assert_eq!(config.holdout_seed, 1);
    }

    #[test]
    fn crossvalidation_conflicts_with_validation_point() {
        assert!(
            Cli::try_parse_from(["hic", "predict", "--crossvalidation", "--validation-point", "1"]).is_err()
        );
    }
}
