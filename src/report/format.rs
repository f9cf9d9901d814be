//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the transform/emulator code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::PreparedDesign;
use crate::config::SystemSettings;
use crate::data::Registry;
use crate::data::params::parameter_label;
use crate::data::registry::experiment_for;
use crate::domain::PointSet;
use crate::domain::SystemId;
use crate::error::PipelineError;
use crate::recombine::AlignedObservable;
use crate::transform::ViscosityPoint;

/// Registry table of one system: observable, bin count and bins.
pub fn format_bins(registry: &Registry, system: &SystemId) -> Result<String, PipelineError> {
    let mut out = String::new();
    out.push_str(&format!("=== hic - centrality bins for {system} ===\n"));
    push_row(&mut out, format!("{:<28} {:>6}  {}", "observable", "n_bins", "bins"));
    push_row(&mut out, format!("{:-<28} {:-<6}  {:-<40}", "", "", ""));
    for (name, bins) in registry.observables(system)? {
        let cells: Vec<String> = bins.iter().map(ToString::to_string).collect();
        push_row(
            &mut out,
            format!("{:<28} {:>6}  {}", truncate(name, 28), bins.len(), cells.join(" ")),
        );
    }
    Ok(out)
}

/// Summary of a prepared design: size, removed points and column ranges.
pub fn format_design_summary(system: &SystemId, design: &PreparedDesign) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== hic - {} design for {system} ({}) ===\n",
        design.pset.as_str(),
        if design.transformed { "transformed" } else { "raw" }
    ));
    out.push_str(&format!(
        "Points: n={} | columns={} | removed={}\n",
        design.rows.len(),
        design.labels.len(),
        design.removed.len()
    ));
    if !design.removed.is_empty() {
        out.push_str(&format!("Removed idx: {}\n", fmt_indices(&design.removed)));
    }
    out.push('\n');

    push_row(&mut out, format!("{:<32} {:>12} {:>12}", "column", "min", "max"));
    push_row(&mut out, format!("{:-<32} {:-<12} {:-<12}", "", "", ""));
    for (label, (lo, hi)) in design.labels.iter().zip(&design.ranges) {
        push_row(&mut out, format!("{:<32} {:>12.6} {:>12.6}", truncate(label, 32), lo, hi));
    }
    if let Some(bounds) = &design.bounds {
        out.push_str("\nDesign ranges:\n");
        push_bounds(&mut out, bounds);
    }
    out
}

/// Raw parameter values of a query, with the design range next to each.
pub fn format_parameters(params: &[f64], bounds: Option<&[(f64, f64)]>) -> String {
    let mut out = String::new();
    push_row(&mut out, format!("{:<32} {:>12} {:>12} {:>12}", "parameter", "value", "min", "max"));
    push_row(&mut out, format!("{:-<32} {:-<12} {:-<12} {:-<12}", "", "", "", ""));
    for (i, value) in params.iter().enumerate() {
        let label = parameter_label(i).unwrap_or("?");
        let (lo, hi) = match bounds.and_then(|b| b.get(i)) {
            Some((lo, hi)) => (format!("{lo:.6}"), format!("{hi:.6}")),
            None => (String::new(), String::new()),
        };
        push_row(
            &mut out,
            format!("{:<32} {:>12.6} {:>12} {:>12}", truncate(label, 32), value, lo, hi),
        );
    }
    out
}

/// Derived settings and file layout of one system.
pub fn format_settings(settings: &SystemSettings) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== hic - settings for {} ({}) ===\n",
        settings.system(),
        settings.idf().label()
    ));
    out.push_str(&format!("Experiment: {}\n", experiment_for(settings.system()).unwrap_or("-")));
    out.push_str(&format!("Run id: {}\n", settings.run_id()));
    out.push_str(&format!(
        "Design points: main={} | validation={} | npc={}\n",
        settings.n_design(),
        settings.n_validation(),
        settings.npc()
    ));
    out.push_str(&format!("Removed idx: {}\n\n", fmt_indices(settings.design_remove_idx())));

    let mut paths = vec![("workdir".to_string(), settings.workdir().display().to_string())];
    for pset in [PointSet::Main, PointSet::Validation] {
        let name = pset.as_str();
        paths.push((format!("{name} design"), settings.design_file(pset).display().to_string()));
        paths.push((format!("{name} ranges"), settings.range_file(pset).display().to_string()));
        paths.push((format!("{name} events"), settings.events_dir(pset).display().to_string()));
        paths.push((format!("{name} obs"), settings.obs_file(pset).display().to_string()));
    }
    paths.push(("labels".to_string(), settings.labels_file().display().to_string()));
    paths.push(("MAP obs".to_string(), settings.map_obs_file().display().to_string()));
    paths.push(("emulator".to_string(), settings.emulator_file().display().to_string()));
    for (name, path) in paths {
        push_row(&mut out, format!("{name:<18} {path}"));
    }
    out
}

/// η/s, ζ/s and τ_π table.
pub fn format_viscosity(points: &[ViscosityPoint]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!("{:>10} {:>12} {:>12} {:>14}", "T [GeV]", "eta/s", "zeta/s", "tau_pi [1/GeV]"),
    );
    push_row(&mut out, format!("{:-<10} {:-<12} {:-<12} {:-<14}", "", "", "", ""));
    for p in points {
        push_row(
            &mut out,
            format!(
                "{:>10.4} {:>12.6} {:>12.6} {:>14.6}",
                p.temperature, p.eta_over_s, p.zeta_over_s, p.tau_pi
            ),
        );
    }
    out
}

/// Aligned prediction bands of one query, with experiment where attached.
pub fn format_predictions(aligned: &[AlignedObservable], query: usize) -> String {
    let mut out = String::new();
    for obs in aligned {
        let (Some(mean), Some(std)) = (obs.mean.get(query), obs.std.get(query)) else {
            continue;
        };
        out.push_str(&format!("{}:\n", obs.name));
        push_row(
            &mut out,
            format!("  {:<10} {:>14} {:>12} {:>14} {:>12}", "cent", "mean", "std", "exp", "err"),
        );
        for (k, bin) in obs.bins.iter().enumerate() {
            let (exp, err) = match &obs.exp {
                Some(band) => (fmt_num(band.mean[k]), fmt_num(band.err[k])),
                None => (String::new(), String::new()),
            };
            push_row(
                &mut out,
                format!(
                    "  {:<10} {:>14} {:>12} {:>14} {:>12}",
                    bin.to_string(),
                    fmt_num(mean[k]),
                    fmt_num(std[k]),
                    exp,
                    err
                ),
            );
        }
        out.push('\n');
    }
    out
}

/// Log-likelihood per query.
pub fn format_likelihood(observables: &[String], values: &[f64]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Likelihood observables: {}\n", observables.join(", ")));
    for (q, v) in values.iter().enumerate() {
        out.push_str(&format!("query {q}: ln L = {v:.4}\n"));
    }
    out
}

fn push_bounds(out: &mut String, bounds: &[(f64, f64)]) {
    for (i, (lo, hi)) in bounds.iter().enumerate() {
        let label = parameter_label(i).unwrap_or("?");
        push_row(out, format!("{:<32} {:>12.6} {:>12.6}", truncate(label, 32), lo, hi));
    }
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

/// Fixed or scientific notation depending on magnitude.
fn fmt_num(v: f64) -> String {
    let a = v.abs();
    if a != 0.0 && !(1e-3..1e5).contains(&a) {
        format!("{v:.4e}")
    } else {
        format!("{v:.5}")
    }
}

fn fmt_indices(v: &[usize]) -> String {
    let parts: Vec<String> = v.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::registry::au_au_200;
    use crate::domain::{CentralityBin, PointSet};
    use crate::recombine::ExpBand;

    #[test]
    fn bins_table_lists_every_observable() {
        let registry = Registry::standard().unwrap();
        let text = format_bins(registry, &au_au_200()).unwrap();
        assert!(text.contains("dN_dy_pion"));
        assert!(text.contains("0-5%"));
        // Title, header, rule, 8 observables.
        assert_eq!(text.lines().count(), 3 + 8);
        assert!(text.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn predictions_show_experiment_when_present() {
        let bins = vec![CentralityBin::new(0.0, 5.0), CentralityBin::new(5.0, 10.0)];
        let aligned = vec![AlignedObservable {
            name: "v22".to_string(),
            midpoints: vec![2.5, 7.5],
            bins,
            mean: vec![vec![0.031, 0.045]],
            std: vec![vec![0.001, 0.002]],
            exp: Some(ExpBand {
                mean: vec![0.03, 0.046],
                err: vec![0.0005, 0.0006],
            }),
        }];
        let text = format_predictions(&aligned, 0);
        assert!(text.starts_with("v22:\n"));
        assert!(text.contains("0.03100"));
        assert!(text.contains("5.0000e-4"));
        assert!(format_predictions(&aligned, 3).is_empty());
    }

    #[test]
    fn design_summary_lists_ranges() {
        let design = PreparedDesign {
            pset: PointSet::Main,
            labels: vec!["norm".to_string(), "trento_p".to_string()],
            idx: vec![0, 2],
            rows: vec![vec![10.0, 0.1], vec![20.0, -0.1]],
            ranges: vec![(10.0, 20.0), (-0.1, 0.1)],
            removed: vec![1],
            transformed: false,
            bounds: Some(vec![(5.0, 25.0), (-0.7, 0.7)]),
        };
        let text = format_design_summary(&au_au_200(), &design);
        assert!(text.contains("Points: n=2 | columns=2 | removed=1"));
        assert!(text.contains("Removed idx: [1]"));
        assert!(text.contains("10.000000"));
        assert!(text.contains("Design ranges:"));
        assert!(text.contains("25.000000"));
    }

    #[test]
    fn parameters_show_design_ranges() {
        let text = format_parameters(&[15.6, 0.06], Some(&[(10.0, 20.0), (-0.7, 0.7)]));
        let norm = text.lines().nth(2).unwrap();
        assert!(norm.starts_with("norm"));
        assert!(norm.contains("15.600000") && norm.contains("10.000000") && norm.contains("20.000000"));

        let bare = format_parameters(&[15.6], None);
        assert_eq!(bare.lines().nth(2).unwrap().trim_end(), bare.lines().nth(2).unwrap());
        assert!(!bare.contains("10.000000"));
    }

    #[test]
    fn settings_list_run_layout() {
        let settings = SystemSettings::new("/work", au_au_200(), crate::domain::Idf::Ce).with_run_id("test_run");
        let text = format_settings(&settings);
        assert!(text.contains("Experiment: STAR"));
        assert!(text.contains("Run id: test_run"));
        assert!(text.contains("npc=10"));
        assert!(text.contains("/work/model_calculations/test_run/Events/validation"));
        assert!(text.contains("/work/model_calculations/MAP/"));
        assert!(text.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("Tmunu_cums_0_0_0", 8), "Tmunu_c.");
        assert_eq!(truncate("v22", 8), "v22");
    }
}
