//! CSV exports.
//!
//! Both exports are meant to be easy to consume in spreadsheets or downstream
//! scripts: one header row, one value per cell, no index gymnastics.

use std::fs::File;
use std::path::Path;

use crate::error::PipelineError;
use crate::recombine::AlignedObservable;

fn create_writer(path: &Path) -> Result<csv::Writer<File>, PipelineError> {
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(csv::Writer::from_writer(file))
}

/// Write a (possibly transformed) design: `idx` then one column per label.
pub fn write_design_csv(
    path: &Path,
    labels: &[String],
    idx: &[usize],
    rows: &[Vec<f64>],
) -> Result<(), PipelineError> {
    if idx.len() != rows.len() {
        return Err(PipelineError::Shape(format!(
            "{} design indices for {} rows",
            idx.len(),
            rows.len()
        )));
    }
    if let Some(row) = rows.iter().find(|r| r.len() != labels.len()) {
        return Err(PipelineError::Shape(format!(
            "design row has {} values for {} labels",
            row.len(),
            labels.len()
        )));
    }

    let mut w = create_writer(path)?;
    let io = |e: csv::Error| PipelineError::io(path, e);

    let mut header = vec!["idx".to_string()];
    header.extend(labels.iter().cloned());
    w.write_record(&header).map_err(io)?;
    for (i, row) in idx.iter().zip(rows) {
        let mut record = vec![i.to_string()];
        record.extend(row.iter().map(|v| format!("{v:.10}")));
        w.write_record(&record).map_err(io)?;
    }
    w.flush().map_err(|e| PipelineError::io(path, e))
}

/// Write aligned predictions, one row per (observable, query, bin).
///
/// Columns: `observable,query,cent_low,cent_high,cent_mid,mean,std`, plus
/// `exp_mean,exp_err` when any observable carries experimental data (left
/// empty for observables without it).
pub fn write_prediction_csv(path: &Path, aligned: &[AlignedObservable]) -> Result<(), PipelineError> {
    let with_exp = aligned.iter().any(|a| a.exp.is_some());
    let mut w = create_writer(path)?;
    let io = |e: csv::Error| PipelineError::io(path, e);

    let mut header = vec!["observable", "query", "cent_low", "cent_high", "cent_mid", "mean", "std"];
    if with_exp {
        header.extend(["exp_mean", "exp_err"]);
    }
    w.write_record(&header).map_err(io)?;

    for obs in aligned {
        for (q, (mean, std)) in obs.mean.iter().zip(&obs.std).enumerate() {
            for (k, bin) in obs.bins.iter().enumerate() {
                let mut record = vec![
                    obs.name.clone(),
                    q.to_string(),
                    bin.low.to_string(),
                    bin.high.to_string(),
                    obs.midpoints[k].to_string(),
                    format!("{:.10}", mean[k]),
                    format!("{:.10}", std[k]),
                ];
                if with_exp {
                    match &obs.exp {
                        Some(exp) => {
                            record.push(format!("{:.10}", exp.mean[k]));
                            record.push(format!("{:.10}", exp.err[k]));
                        }
                        None => record.extend([String::new(), String::new()]),
                    }
                }
                w.write_record(&record).map_err(io)?;
            }
        }
    }
    w.flush().map_err(|e| PipelineError::io(path, e))
}
