//! Align emulator output with the registry and experimental data.

use serde::Serialize;
use tracing::debug;

use crate::data::Registry;
use crate::domain::{CentralityBin, Idf, SystemId};
use crate::emulator::PredictionBundle;
use crate::error::PipelineError;
use crate::io::experiment::{ExpData, ExpObservable};

/// Tolerance on centrality edges when matching experimental bins.
const EDGE_TOL: f64 = 1e-9;

/// Experimental points attached to an aligned observable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpBand {
    pub mean: Vec<f64>,
    pub err: Vec<f64>,
}

/// One observable's prediction laid out on its registered centrality bins.
///
/// `mean` and `std` are `n_queries × n_bins`; `std` is the square root of the
/// absolute diagonal of the within-observable covariance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedObservable {
    pub name: String,
    pub bins: Vec<CentralityBin>,
    pub midpoints: Vec<f64>,
    pub mean: Vec<Vec<f64>>,
    pub std: Vec<Vec<f64>>,
    pub exp: Option<ExpBand>,
}

/// Align the requested observables of a prediction.
///
/// Bin counts must agree exactly between emulator output, registry and (when
/// given) the experimental arrays; nothing is truncated or padded. An
/// observable without experimental data for the chosen model gets `exp: None`.
pub fn align(
    bundle: &PredictionBundle,
    registry: &Registry,
    system: &SystemId,
    observables: &[impl AsRef<str>],
    exp: Option<(&ExpData, Idf)>,
) -> Result<Vec<AlignedObservable>, PipelineError> {
    if bundle.system() != system {
        return Err(PipelineError::Config(format!(
            "prediction is for {}, alignment requested for {system}",
            bundle.system()
        )));
    }
    if let Some((data, _)) = exp {
        if data.system() != system {
            return Err(PipelineError::Config(format!(
                "experimental data is for {}, alignment requested for {system}",
                data.system()
            )));
        }
    }

    let out = observables
        .iter()
        .map(|name| align_one(bundle, registry, system, name.as_ref(), exp))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(system = %system, observables = out.len(), "prediction aligned");
    Ok(out)
}

fn align_one(
    bundle: &PredictionBundle,
    registry: &Registry,
    system: &SystemId,
    name: &str,
    exp: Option<(&ExpData, Idf)>,
) -> Result<AlignedObservable, PipelineError> {
    let bins = registry.bins_for(system, name)?;
    let n_emu = bundle.n_bins(name)?;
    if n_emu != bins.len() {
        return Err(PipelineError::alignment(
            name,
            format!("emulator has {n_emu} bins, registry has {}", bins.len()),
        ));
    }

    let mean = bundle.mean(name)?;
    let std = bundle
        .covariance(name, name)?
        .iter()
        .map(|c| c.diagonal().iter().map(|v| v.abs().sqrt()).collect())
        .collect();

    let exp = match exp.and_then(|(data, idf)| data.get(name, idf)) {
        Some(measured) => {
            check_exp_bins(name, bins, measured)?;
            Some(ExpBand {
                mean: measured.mean.clone(),
                err: measured.err.clone(),
            })
        }
        None => None,
    };

    Ok(AlignedObservable {
        name: name.to_string(),
        bins: bins.to_vec(),
        midpoints: bins.iter().map(CentralityBin::midpoint).collect(),
        mean,
        std,
        exp,
    })
}

pub(crate) fn check_exp_bins(
    name: &str,
    bins: &[CentralityBin],
    measured: &ExpObservable,
) -> Result<(), PipelineError> {
    if measured.len() != bins.len() {
        return Err(PipelineError::alignment(
            name,
            format!("experiment has {} bins, registry has {}", measured.len(), bins.len()),
        ));
    }
    if measured.bins.len() != bins.len() || measured.err.len() != bins.len() {
        return Err(PipelineError::alignment(
            name,
            format!(
                "experiment has {} bins, {} means and {} errors, registry has {} bins",
                measured.bins.len(),
                measured.mean.len(),
                measured.err.len(),
                bins.len()
            ),
        ));
    }
    if let Some((reg, got)) = bins.iter().zip(&measured.bins).find(|(reg, got)| {
        (reg.low - got.low).abs() > EDGE_TOL || (reg.high - got.high).abs() > EDGE_TOL
    }) {
        return Err(PipelineError::alignment(
            name,
            format!("experimental bin {got} does not match registered bin {reg}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::registry::{ALICE_CENT_BINS, STAR_CENT_BINS, xe_xe_5440};
    use crate::emulator::Emulator;
    use crate::emulator::fixtures::{fixture_artifact, fixture_queries};

    fn xe_bundle() -> PredictionBundle {
        let registry = Registry::standard().unwrap();
        let emu = Emulator::from_artifact(&fixture_artifact(&xe_xe_5440(), registry, true)).unwrap();
        emu.predict(&fixture_queries(2)).unwrap()
    }

    fn measured(bins: &[(f64, f64)]) -> ExpObservable {
        ExpObservable {
            bins: bins.iter().map(|&(l, h)| CentralityBin::new(l, h)).collect(),
            mean: vec![0.05; bins.len()],
            err: vec![0.002; bins.len()],
        }
    }

    #[test]
    fn aligned_shapes_follow_registry() {
        let registry = Registry::standard().unwrap();
        let system = xe_xe_5440();
        let bundle = xe_bundle();
        let aligned = align(&bundle, registry, &system, &["v22", "dNch_deta"], None).unwrap();

        assert_eq!(aligned[0].name, "v22");
        assert_eq!(aligned[0].bins.len(), 8);
        assert_eq!(aligned[0].midpoints[2], 15.0);
        assert_eq!(aligned[1].mean.len(), 2);
        assert_eq!(aligned[1].std[1].len(), 10);
        assert!(aligned.iter().all(|a| a.exp.is_none()));

        let cov = bundle.covariance("v22", "v22").unwrap();
        assert!((aligned[0].std[0][3] - cov[0][(3, 3)].abs().sqrt()).abs() < 1e-15);
    }

    #[test]
    fn eight_emulator_bins_against_nine_registered_is_rejected() {
        // Same system, but v22 registered on the nine STAR bins.
        let system = xe_xe_5440();
        let registry = Registry::builder()
            .observable(&system, "v22", STAR_CENT_BINS)
            .build()
            .unwrap();
        match align(&xe_bundle(), &registry, &system, &["v22"], None) {
            Err(PipelineError::Alignment { observable, message }) => {
                assert_eq!(observable, "v22");
                assert!(message.contains('8') && message.contains('9'), "{message}");
            }
            other => panic!("expected alignment error, got {other:?}"),
        }
    }

    #[test]
    fn experimental_bins_must_match() {
        let registry = Registry::standard().unwrap();
        let system = xe_xe_5440();
        let bundle = xe_bundle();

        let mut data = ExpData::new(system.clone());
        data.insert("v22", Idf::Ce, measured(ALICE_CENT_BINS));
        let aligned = align(&bundle, registry, &system, &["v22"], Some((&data, Idf::Ce))).unwrap();
        assert_eq!(aligned[0].exp.as_ref().unwrap().mean.len(), 8);

        // Missing for another idf: no band, not an error.
        let aligned = align(&bundle, registry, &system, &["v22"], Some((&data, Idf::Grad))).unwrap();
        assert!(aligned[0].exp.is_none());

        let mut short = ExpData::new(system.clone());
        short.insert("v22", Idf::Ce, measured(&ALICE_CENT_BINS[..7]));
        assert!(matches!(
            align(&bundle, registry, &system, &["v22"], Some((&short, Idf::Ce))),
            Err(PipelineError::Alignment { .. })
        ));

        let mut shifted_bins = ALICE_CENT_BINS.to_vec();
        shifted_bins[0] = (0.0, 2.5);
        let mut shifted = ExpData::new(system.clone());
        shifted.insert("v22", Idf::Ce, measured(&shifted_bins));
        assert!(matches!(
            align(&bundle, registry, &system, &["v22"], Some((&shifted, Idf::Ce))),
            Err(PipelineError::Alignment { .. })
        ));
    }

    #[test]
    fn experimental_error_length_must_match() {
        let registry = Registry::standard().unwrap();
        let system = xe_xe_5440();
        let bundle = xe_bundle();

        for n_err in [7, 9] {
            let mut obs = measured(ALICE_CENT_BINS);
            obs.err = vec![0.002; n_err];
            let mut data = ExpData::new(system.clone());
            data.insert("v22", Idf::Ce, obs);
            match align(&bundle, registry, &system, &["v22"], Some((&data, Idf::Ce))) {
                Err(PipelineError::Alignment { message, .. }) => {
                    assert!(message.contains(&format!("{n_err} errors")), "{message}")
                }
                other => panic!("expected alignment error, got {other:?}"),
            }
        }

        let mut obs = measured(ALICE_CENT_BINS);
        obs.bins.pop();
        let mut data = ExpData::new(system.clone());
        data.insert("v22", Idf::Ce, obs);
        assert!(matches!(
            align(&bundle, registry, &system, &["v22"], Some((&data, Idf::Ce))),
            Err(PipelineError::Alignment { .. })
        ));
    }

    #[test]
    fn unknown_observable_is_unknown_key() {
        let registry = Registry::standard().unwrap();
        let system = xe_xe_5440();
        assert!(matches!(
            align(&xe_bundle(), registry, &system, &["v42"], None),
            Err(PipelineError::UnknownKey { .. })
        ));
    }
}
