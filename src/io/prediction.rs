//! Prediction JSON export.
//!
//! A self-describing snapshot of one `hic predict` run: what was queried, with
//! which model, and the aligned bands that came out.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Idf, SystemId};
use crate::error::PipelineError;
use crate::recombine::AlignedObservable;

#[derive(Debug, Clone, Serialize)]
pub struct PredictionFile<'a> {
    pub tool: &'static str,
    pub generated_at: DateTime<Utc>,
    pub system: &'a SystemId,
    pub idf: Idf,
    pub idf_label: &'static str,
    pub transform_design: bool,
    /// Raw parameter vectors as queried (after held parameters were applied).
    pub params: &'a [Vec<f64>],
    pub observables: &'a [AlignedObservable],
    /// One value per query when experimental data was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_likelihood: Option<&'a [f64]>,
}

impl<'a> PredictionFile<'a> {
    pub fn new(
        system: &'a SystemId,
        idf: Idf,
        transform_design: bool,
        params: &'a [Vec<f64>],
        observables: &'a [AlignedObservable],
    ) -> Self {
        Self {
            tool: "hic",
            generated_at: Utc::now(),
            system,
            idf,
            idf_label: idf.label(),
            transform_design,
            params,
            observables,
            log_likelihood: None,
        }
    }

    pub fn with_log_likelihood(mut self, values: &'a [f64]) -> Self {
        self.log_likelihood = Some(values);
        self
    }
}

/// Write a prediction JSON file.
pub fn write_prediction_json(path: &Path, file: &PredictionFile<'_>) -> Result<(), PipelineError> {
    let out = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::to_writer_pretty(out, file).map_err(|e| PipelineError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::registry::pb_pb_2760;
    use crate::domain::CentralityBin;

    #[test]
    fn json_carries_metadata_and_bands() {
        let path = std::env::temp_dir().join(format!(
            "hic_emulator_prediction_{}_{}.json",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let system = pb_pb_2760();
        let params = vec![vec![1.0; 17]];
        let bins = vec![CentralityBin::new(0.0, 5.0)];
        let aligned = vec![AlignedObservable {
            name: "v22".to_string(),
            midpoints: vec![2.5],
            bins,
            mean: vec![vec![0.03]],
            std: vec![vec![0.001]],
            exp: None,
        }];
        let ll = [-12.5];
        let file = PredictionFile::new(&system, Idf::Pb, true, &params, &aligned).with_log_likelihood(&ll);
        write_prediction_json(&path, &file).unwrap();

        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["system"], "Pb-Pb-2760");
        assert_eq!(v["idf"], "pb");
        assert_eq!(v["idf_label"], "Pratt-Bernhard");
        assert_eq!(v["observables"][0]["bins"][0]["high"], 5.0);
        assert_eq!(v["log_likelihood"][0], -12.5);
        assert!(v["generated_at"].as_str().unwrap().contains('T'));
        let _ = std::fs::remove_file(&path);
    }
}
