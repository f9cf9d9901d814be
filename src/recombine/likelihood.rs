//! Gaussian log-likelihood of experiment given the emulator.
//!
//! For one query row the observables are stacked into a single vector and
//!
//! ```text
//! Σ = Σ_emu + Σ_exp
//! ln L = -½ (rᵀ Σ⁻¹ r + ln det Σ + n ln 2π),   r = y_exp - y_emu
//! ```
//!
//! `Σ_emu` keeps the cross-observable blocks. `Σ_exp` is block diagonal: plain
//! `err²` on the diagonal, or a squared-exponential correlation in centrality
//! within each observable when correlated experimental errors are assumed.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::data::Registry;
use crate::domain::{AnalysisConfig, CentralityBin};
use crate::emulator::PredictionBundle;
use crate::error::PipelineError;
use crate::io::experiment::ExpData;
use crate::math::gaussian_log_density;
use crate::recombine::align::check_exp_bins;

/// Experimental covariance of one observable.
///
/// With `corr_length = Some(ℓ)` the entries are
/// `err_i err_j exp(-½ ((m_i - m_j) / (100 ℓ))²)` with `m` the bin midpoints in
/// percent; otherwise the matrix is `diag(err²)`.
pub fn exp_covariance(bins: &[CentralityBin], err: &[f64], corr_length: Option<f64>) -> DMatrix<f64> {
    let n = err.len();
    match corr_length {
        None => DMatrix::from_diagonal(&DVector::from_iterator(n, err.iter().map(|e| e * e))),
        Some(length) => {
            let scale = 100.0 * length;
            DMatrix::from_fn(n, n, |i, j| {
                let d = (bins[i].midpoint() - bins[j].midpoint()) / scale;
                err[i] * err[j] * (-0.5 * d * d).exp()
            })
        }
    }
}

/// Log-likelihood of query row `query` against `exp` over `observables`.
///
/// The experimental error policy and correlation switches come from `config`;
/// experimental arrays are read for `config.idf`.
pub fn log_likelihood(
    bundle: &PredictionBundle,
    registry: &Registry,
    observables: &[impl AsRef<str>],
    exp: &ExpData,
    config: &AnalysisConfig,
    query: usize,
) -> Result<f64, PipelineError> {
    let system = bundle.system();
    if observables.is_empty() {
        return Err(PipelineError::Config("likelihood needs at least one observable".to_string()));
    }

    let corr = config.assume_corr_exp_error.then_some(config.cent_corr_length);
    let mut offsets = Vec::with_capacity(observables.len());
    let mut residual = Vec::new();
    let mut exp_blocks = Vec::with_capacity(observables.len());
    for name in observables {
        let name = name.as_ref();
        let bins = registry.bins_for(system, name)?;
        let measured = exp.get(name, config.idf).ok_or_else(|| {
            PipelineError::alignment(name, format!("no experimental data for {}", config.idf.short_label()))
        })?;
        check_exp_bins(name, bins, measured)?;
        let emu = bundle.mean_at(query, name)?;
        if emu.len() != bins.len() {
            return Err(PipelineError::alignment(
                name,
                format!("emulator has {} bins, registry has {}", emu.len(), bins.len()),
            ));
        }

        offsets.push(residual.len());
        residual.extend(measured.mean.iter().zip(emu).map(|(y, m)| y - m));
        let err: Vec<f64> = measured.err.iter().map(|e| config.exp_error.apply(name, *e)).collect();
        exp_blocks.push(exp_covariance(bins, &err, corr));
    }

    let n = residual.len();
    let mut cov = DMatrix::zeros(n, n);
    for (a, name_a) in observables.iter().enumerate() {
        for (b, name_b) in observables.iter().enumerate() {
            let block = bundle.covariance_at(query, name_a.as_ref(), name_b.as_ref())?;
            cov.view_mut((offsets[a], offsets[b]), block.shape()).copy_from(&block);
        }
        let exp_block = &exp_blocks[a];
        let mut diag = cov.view_mut((offsets[a], offsets[a]), exp_block.shape());
        diag += exp_block;
    }

    let value = gaussian_log_density(&DVector::from_vec(residual), &cov)?;
    debug!(system = %system, query, points = n, log_likelihood = value, "likelihood evaluated");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::registry::xe_xe_5440;
    use crate::domain::Idf;
    use crate::emulator::Emulator;
    use crate::emulator::fixtures::{fixture_artifact, fixture_queries};
    use crate::io::experiment::ExpObservable;

    fn setup() -> (PredictionBundle, &'static Registry, ExpData) {
        let registry = Registry::standard().unwrap();
        let system = xe_xe_5440();
        let emu = Emulator::from_artifact(&fixture_artifact(&system, registry, true)).unwrap();
        let bundle = emu.predict(&fixture_queries(2)).unwrap();

        let mut data = ExpData::new(system.clone());
        for name in ["v22", "v32"] {
            let bins = registry.bins_for(&system, name).unwrap().to_vec();
            let mean = bundle.mean_at(0, name).unwrap().iter().map(|m| m + 0.5).collect();
            let err = vec![0.3; bins.len()];
            data.insert(name, Idf::Ce, ExpObservable { bins, mean, err });
        }
        (bundle, registry, data)
    }

    #[test]
    fn uncorrelated_exp_covariance_is_diagonal() {
        let bins = [CentralityBin::new(0.0, 5.0), CentralityBin::new(5.0, 10.0)];
        let cov = exp_covariance(&bins, &[0.1, 0.2], None);
        assert!((cov[(0, 0)] - 0.01).abs() < 1e-15);
        assert!((cov[(1, 1)] - 0.04).abs() < 1e-15);
        assert_eq!(cov[(0, 1)], 0.0);
    }

    #[test]
    fn correlated_exp_covariance_decays_with_centrality_distance() {
        let bins = [CentralityBin::new(0.0, 5.0), CentralityBin::new(5.0, 10.0), CentralityBin::new(60.0, 70.0)];
        let cov = exp_covariance(&bins, &[0.1, 0.1, 0.1], Some(0.5));
        assert!((cov[(0, 0)] - 0.01).abs() < 1e-15);
        // Midpoints 2.5 and 7.5: d = 5 / 50 = 0.1.
        assert!((cov[(0, 1)] - 0.01 * (-0.005_f64).exp()).abs() < 1e-15);
        assert!(cov[(0, 2)] < cov[(0, 1)]);
        assert!((&cov - cov.transpose()).abs().max() < 1e-18);
    }

    #[test]
    fn likelihood_matches_direct_density() {
        let (bundle, registry, data) = setup();
        let config = AnalysisConfig::default();
        let got = log_likelihood(&bundle, registry, &["v22"], &data, &config, 0).unwrap();

        let r = DVector::from_element(8, 0.5);
        let cov = bundle.covariance_at(0, "v22", "v22").unwrap() + DMatrix::from_diagonal_element(8, 8, 0.09);
        let expected = gaussian_log_density(&r, &cov).unwrap();
        assert!((got - expected).abs() < 1e-9, "{got} vs {expected}");
    }

    #[test]
    fn error_policy_changes_likelihood() {
        let (bundle, registry, data) = setup();
        let base = AnalysisConfig::default();
        let l0 = log_likelihood(&bundle, registry, &["v22", "v32"], &data, &base, 0).unwrap();

        let mut scaled = base.clone();
        scaled.exp_error.scale.insert("v22".to_string(), 3.0);
        let l1 = log_likelihood(&bundle, registry, &["v22", "v32"], &data, &scaled, 0).unwrap();
        assert!(l1.is_finite());
        assert!((l0 - l1).abs() > 1e-6);

        let mut corr = base.clone();
        corr.assume_corr_exp_error = true;
        let l2 = log_likelihood(&bundle, registry, &["v22", "v32"], &data, &corr, 0).unwrap();
        assert!(l2.is_finite());
        assert!((l0 - l2).abs() > 1e-6);
    }

    #[test]
    fn mismatched_error_array_is_rejected() {
        let (bundle, registry, data) = setup();
        let config = AnalysisConfig::default();
        for n_err in [7, 9] {
            let mut short = data.clone();
            let mut v22 = data.get("v22", Idf::Ce).unwrap().clone();
            v22.err = vec![0.3; n_err];
            short.insert("v22", Idf::Ce, v22);
            assert!(matches!(
                log_likelihood(&bundle, registry, &["v22"], &short, &config, 0),
                Err(PipelineError::Alignment { .. })
            ));
        }
    }

    #[test]
    fn missing_experiment_is_alignment_error() {
        let (bundle, registry, data) = setup();
        let config = AnalysisConfig::default();
        assert!(matches!(
            log_likelihood(&bundle, registry, &["dNch_deta"], &data, &config, 0),
            Err(PipelineError::Alignment { .. })
        ));
        assert!(matches!(
            log_likelihood(&bundle, registry, &["v22"], &data, &config, 5),
            Err(PipelineError::Shape(_))
        ));
    }
}
