//! Model parameter tables: the design column contract, best-fit (MAP) values,
//! and the design points excluded from emulator training.

use crate::domain::{Idf, SystemId};
use crate::error::PipelineError;

/// Number of raw model parameters in a design point.
pub const N_PARAMS: usize = 17;

/// Column contract of the raw design: `(label, description)` in column order.
///
/// Design files, the design transform and trained emulators all share this
/// order. Reordering requires retraining.
pub const PARAMETERS: [(&str, &str); N_PARAMS] = [
    ("norm", "Energy Normalization"),
    ("trento_p", "TRENTo Reduced Thickness"),
    ("sigma_k", "Multiplicity Fluctuation"),
    ("nucleon_width", "Nucleon width [fm]"),
    ("dmin3", "Min. Distance btw. nucleons cubed [fm^3]"),
    ("tau_R", "Free-streaming time scale [fm/c]"),
    ("alpha", "Free-streaming energy dep."),
    ("eta_over_s_T_kink_in_GeV", "Temperature of shear kink [GeV]"),
    ("eta_over_s_low_T_slope_in_GeV", "Low-temp. shear slope [GeV^-1]"),
    ("eta_over_s_high_T_slope_in_GeV", "High-temp shear slope [GeV^-1]"),
    ("eta_over_s_at_kink", "Shear viscosity at kink"),
    ("zeta_over_s_max", "Bulk viscosity max."),
    ("zeta_over_s_T_peak_in_GeV", "Temperature of max. bulk viscosity [GeV]"),
    ("zeta_over_s_width_in_GeV", "Width of bulk viscosity [GeV]"),
    ("zeta_over_s_lambda_asymm", "Skewness of bulk viscosity"),
    ("shear_relax_time_factor", "Shear relaxation time normalization"),
    ("Tswitch", "Particlization temperature [GeV]"),
];

/// Label of a raw design column.
pub fn parameter_label(index: usize) -> Option<&'static str> {
    PARAMETERS.get(index).map(|(label, _)| *label)
}

/// Column index of a raw design label.
pub fn parameter_index(label: &str) -> Option<usize> {
    PARAMETERS.iter().position(|(l, _)| *l == label)
}

/// Parameters held fixed for emulator validation (validation point 0).
pub const VALIDATION_HOLD_SET: &[(usize, f64)] = &[
    (1, -0.61335),
    (2, 1.17739),
    (4, 1.24173),
    (6, 0.11881),
    (15, 4.48798),
];

// Maximum a posteriori values from the parallel-tempering posterior.
const MAP_PB_PB_2760_GRAD: [f64; N_PARAMS] = [
    14.2, 0.06, 1.05, 1.12, 3.00, 1.46, 0.031, 0.223, -0.78, 0.37, 0.096, 0.13, 0.12, 0.072, -0.12, 4.65, 0.136,
];
const MAP_AU_AU_200_GRAD: [f64; N_PARAMS] = [
    5.73, 0.06, 1.05, 1.12, 3.00, 1.46, 0.031, 0.223, -0.78, 0.37, 0.096, 0.13, 0.12, 0.072, -0.12, 4.65, 0.136,
];
const MAP_PB_PB_2760_CE: [f64; N_PARAMS] = [
    15.6, 0.06, 1.00, 1.19, 2.60, 1.04, 0.024, 0.268, -0.73, 0.38, 0.042, 0.127, 0.12, 0.025, 0.095, 5.6, 0.146,
];
const MAP_AU_AU_200_CE: [f64; N_PARAMS] = [
    6.24, 0.06, 1.00, 1.19, 2.60, 1.04, 0.024, 0.268, -0.73, 0.38, 0.042, 0.127, 0.12, 0.025, 0.095, 5.6, 0.146,
];
const MAP_PB_PB_2760_PB: [f64; N_PARAMS] = [
    13.2, 0.14, 0.98, 0.81, 3.11, 1.46, 0.017, 0.194, -0.47, 1.62, 0.105, 0.165, 0.194, 0.026, -0.072, 5.54, 0.147,
];
const MAP_AU_AU_200_PB: [f64; N_PARAMS] = [
    5.31, 0.14, 0.98, 0.81, 3.11, 1.46, 0.017, 0.194, -0.47, 1.62, 0.105, 0.165, 0.194, 0.026, -0.072, 5.54, 0.147,
];

/// MAP parameter vector for a system and particlization model.
pub fn map_params(system: &SystemId, idf: Idf) -> Result<[f64; N_PARAMS], PipelineError> {
    let params = match (system.key(), idf) {
        (("Pb", "Pb", 2760), Idf::Grad) => MAP_PB_PB_2760_GRAD,
        (("Au", "Au", 200), Idf::Grad) => MAP_AU_AU_200_GRAD,
        (("Pb", "Pb", 2760), Idf::Ce) => MAP_PB_PB_2760_CE,
        (("Au", "Au", 200), Idf::Ce) => MAP_AU_AU_200_CE,
        (("Pb", "Pb", 2760), Idf::Pb) => MAP_PB_PB_2760_PB,
        (("Au", "Au", 200), Idf::Pb) => MAP_AU_AU_200_PB,
        _ => {
            return Err(PipelineError::Config(format!(
                "no MAP parameters for {system} with {}",
                idf.short_label()
            )));
        }
    };
    Ok(params)
}

/// Design points whose model runs produced NaNs, per particlization model (500-point design).
fn nan_design_points(idf: Idf) -> &'static [usize] {
    match idf {
        Idf::Grad => &[334, 341, 377, 429, 447, 483],
        Idf::Ce => &[285, 334, 341, 447, 483, 495],
        Idf::Pm => &[
            209, 280, 322, 334, 341, 412, 421, 424, 429, 432, 446, 447, 453, 468, 483, 495,
        ],
        Idf::Pb => &[
            60, 232, 280, 285, 322, 324, 341, 377, 432, 447, 464, 468, 482, 483, 485, 495,
        ],
    }
}

const UNFINISHED_EVENTS_DESIGN_POINTS: &[usize] = &[289, 324, 326, 459, 462, 242, 406, 440, 123];
const STRANGE_FEATURES_DESIGN_POINTS: &[usize] = &[289, 324, 440, 459, 462];

/// Design points removed before building the emulator design (sorted, unique).
pub fn design_remove_idx(idf: Idf) -> Vec<usize> {
    let mut out: Vec<usize> = nan_design_points(idf)
        .iter()
        .chain(UNFINISHED_EVENTS_DESIGN_POINTS)
        .chain(STRANGE_FEATURES_DESIGN_POINTS)
        .copied()
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Validation points dropped from the validation set (Grad model).
pub const DELETE_VALIDATION_POINTS: &[usize] = &[10, 68, 93];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::registry::{au_au_200, pb_pb_2760, xe_xe_5440};

    #[test]
    fn parameter_labels_follow_column_contract() {
        assert_eq!(parameter_label(7), Some("eta_over_s_T_kink_in_GeV"));
        assert_eq!(parameter_index("Tswitch"), Some(16));
        assert_eq!(parameter_index("nope"), None);
    }

    #[test]
    fn map_params_cover_known_models() {
        let p = map_params(&pb_pb_2760(), Idf::Grad).unwrap();
        assert_eq!(p[7], 0.223);
        assert_eq!(p[10], 0.096);
        assert_eq!(map_params(&au_au_200(), Idf::Ce).unwrap()[0], 6.24);
        assert!(map_params(&pb_pb_2760(), Idf::Pm).is_err());
        assert!(map_params(&xe_xe_5440(), Idf::Grad).is_err());
    }

    #[test]
    fn removal_set_is_sorted_union() {
        let idx = design_remove_idx(Idf::Ce);
        assert!(idx.windows(2).all(|w| w[0] < w[1]));
        for p in [285, 334, 123, 440, 289] {
            assert!(idx.contains(&p));
        }
        // 6 NaN + 9 unfinished (strange ones are a subset), no overlap.
        assert_eq!(idx.len(), 15);
    }
}
