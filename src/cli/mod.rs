//! Command-line parsing for the `hic` emulator tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! transform/emulator code. Arguments are converted into `AnalysisConfig` and
//! `SystemSettings` in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Idf, PointSet, SystemId};
use crate::transform::{DISPLAY_POINTS, DISPLAY_T_HIGH, DISPLAY_T_LOW};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "hic", version, about = "Heavy-ion collision emulator: design transform and prediction")]
pub struct Cli {
    /// Log level for diagnostics on stderr.
    #[arg(long, global = true, default_value_t = tracing::Level::WARN)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the centrality bins registered for a collision system.
    Bins(BinsArgs),
    /// Print the derived settings and file layout of a collision system.
    Settings(SettingsArgs),
    /// Load a design, drop excluded points and apply the design transform.
    Transform(TransformArgs),
    /// Tabulate η/s and ζ/s for the MAP point (with overrides).
    Viscosity(ViscosityArgs),
    /// Query a trained emulator and print aligned predictions.
    Predict(PredictArgs),
    /// List the cross-validation hold-out design points.
    Holdout(HoldoutArgs),
}

/// Collision system and particlization model shared by most commands.
#[derive(Debug, Args, Clone)]
pub struct SystemArgs {
    /// Collision system, e.g. Pb-Pb-2760.
    #[arg(long, default_value = "Pb-Pb-2760")]
    pub system: SystemId,

    /// Viscous correction model.
    #[arg(long, value_enum, default_value_t = Idf::Ce)]
    pub idf: Idf,

    /// Working directory (defaults to $WORKDIR, then `.`).
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Model-calculation run id (defaults to the production run).
    #[arg(long)]
    pub run_id: Option<String>,
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(flatten)]
    pub sys: SystemArgs,
}

#[derive(Debug, Args)]
pub struct BinsArgs {
    #[arg(long, default_value = "Pb-Pb-2760")]
    pub system: SystemId,

    /// Use the calibration table instead of the full one.
    #[arg(long)]
    pub calibration: bool,
}

#[derive(Debug, Args)]
pub struct TransformArgs {
    #[command(flatten)]
    pub sys: SystemArgs,

    /// Which design point set to load.
    #[arg(long, value_enum, default_value_t = PointSet::Main)]
    pub pset: PointSet,

    /// Keep the raw design columns.
    #[arg(long)]
    pub no_transform: bool,

    /// Omit a seeded fifth of the main design (cross-validation).
    #[arg(long)]
    pub crossvalidation: bool,

    /// Seed for the cross-validation hold-out.
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Export the resulting design to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ViscosityArgs {
    #[command(flatten)]
    pub sys: SystemArgs,

    /// Override a parameter: `index=value` or `label=value` (repeatable).
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(usize, f64)>,

    #[arg(long, default_value_t = DISPLAY_T_LOW)]
    pub t_low: f64,

    #[arg(long, default_value_t = DISPLAY_T_HIGH)]
    pub t_high: f64,

    /// Number of temperatures.
    #[arg(long, default_value_t = DISPLAY_POINTS)]
    pub points: usize,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    #[command(flatten)]
    pub sys: SystemArgs,

    /// Emulator artifact (defaults to `emulator/emulator-{system}-idf-{idf}.json`).
    #[arg(long, value_name = "JSON")]
    pub emulator: Option<PathBuf>,

    /// Override a parameter of the query: `index=value` or `label=value`.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(usize, f64)>,

    /// Hold the validation parameter set fixed.
    #[arg(long)]
    pub hold: bool,

    /// Query independent validation point N instead of the MAP point.
    #[arg(long, value_name = "N", conflicts_with = "crossvalidation")]
    pub validation_point: Option<usize>,

    /// Query every cross-validation hold-out point.
    #[arg(long)]
    pub crossvalidation: bool,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Experimental data CSV; enables the likelihood.
    #[arg(long, value_name = "CSV")]
    pub exp: Option<PathBuf>,

    /// Set every experimental error to zero.
    #[arg(long)]
    pub zero_exp_error: bool,

    /// Scale one observable's experimental error: `observable=factor` (repeatable).
    #[arg(long = "scale-exp-error", value_name = "OBS=FACTOR", value_parser = parse_scale)]
    pub scale_exp_error: Vec<(String, f64)>,

    /// Correlate experimental errors across centrality bins.
    #[arg(long)]
    pub corr_exp_error: bool,

    /// Centrality correlation length (fraction of centrality).
    #[arg(long, default_value_t = 0.5)]
    pub cent_corr_length: f64,

    /// Export aligned predictions to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export aligned predictions to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct HoldoutArgs {
    #[command(flatten)]
    pub sys: SystemArgs,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}

/// Parse `index=value` or `label=value`.
pub fn parse_param(s: &str) -> Result<(usize, f64), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    let index = match key.parse::<usize>() {
        Ok(i) if i < crate::data::params::N_PARAMS => i,
        Ok(i) => return Err(format!("parameter index {i} out of range")),
        Err(_) => crate::data::params::parameter_index(key).ok_or_else(|| format!("unknown parameter '{key}'"))?,
    };
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value in '{s}': {e}"))?;
    Ok((index, value))
}

fn parse_scale(s: &str) -> Result<(String, f64), String> {
    let (obs, factor) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OBS=FACTOR, got '{s}'"))?;
    let factor = factor
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid factor in '{s}': {e}"))?;
    if !factor.is_finite() || factor < 0.0 {
        return Err(format!("factor must be finite and >= 0, got {factor}"));
    }
    Ok((obs.trim().to_string(), factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_accept_index_or_label() {
        assert_eq!(parse_param("16=0.15").unwrap(), (16, 0.15));
        assert_eq!(parse_param("Tswitch=0.15").unwrap(), (16, 0.15));
        assert!(parse_param("17=1").is_err());
        assert!(parse_param("bogus=1").is_err());
        assert!(parse_param("norm").is_err());
    }

    #[test]
    fn predict_args_parse() {
        let cli = Cli::try_parse_from([
            "hic",
            "predict",
            "--system",
            "Au-Au-200",
            "--idf",
            "grad",
            "--param",
            "norm=5.5",
            "--scale-exp-error",
            "v22=2",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.sys.system.to_string(), "Au-Au-200");
        assert_eq!(args.sys.idf, Idf::Grad);
        assert_eq!(args.params, vec![(0, 5.5)]);
        assert_eq!(args.scale_exp_error, vec![("v22".to_string(), 2.0)]);
        assert!(args.sys.run_id.is_none());
    }

    #[test]
    fn settings_accepts_run_id() {
        let cli = Cli::try_parse_from(["hic", "settings", "--system", "Au-Au-200", "--run-id", "rerun_2"]).unwrap();
        let Command::Settings(args) = cli.command else {
            panic!("expected settings");
        };
        assert_eq!(args.sys.run_id.as_deref(), Some("rerun_2"));
    }

    #[test]
    fn bad_system_is_rejected() {
        assert!(Cli::try_parse_from(["hic", "bins", "--system", "PbPb"]).is_err());
    }
}
