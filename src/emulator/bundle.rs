//! Structured emulator output.

use std::ops::Range;

use indexmap::IndexMap;
use nalgebra::{DMatrix, DVector};

use crate::domain::SystemId;
use crate::error::PipelineError;

/// Mean and covariance of every emulated observable for a batch of queries.
///
/// Internally each query holds the full flattened output vector and its
/// covariance; accessors slice them per observable. A bundle is immutable
/// once returned.
#[derive(Debug, Clone)]
pub struct PredictionBundle {
    system: SystemId,
    layout: IndexMap<String, Range<usize>>,
    means: Vec<DVector<f64>>,
    covs: Vec<DMatrix<f64>>,
}

impl PredictionBundle {
    pub(crate) fn new(
        system: SystemId,
        layout: IndexMap<String, Range<usize>>,
        means: Vec<DVector<f64>>,
        covs: Vec<DMatrix<f64>>,
    ) -> Self {
        Self {
            system,
            layout,
            means,
            covs,
        }
    }

    pub fn system(&self) -> &SystemId {
        &self.system
    }

    pub fn n_queries(&self) -> usize {
        self.means.len()
    }

    /// Emulated observables in output order.
    pub fn observables(&self) -> impl Iterator<Item = &str> {
        self.layout.keys().map(String::as_str)
    }

    pub fn n_bins(&self, observable: &str) -> Result<usize, PipelineError> {
        Ok(self.range(observable)?.len())
    }

    fn range(&self, observable: &str) -> Result<Range<usize>, PipelineError> {
        self.layout
            .get(observable)
            .cloned()
            .ok_or_else(|| PipelineError::unknown_key(self.system.to_string(), observable))
    }

    /// Mean of one observable, `n_queries × n_bins`.
    pub fn mean(&self, observable: &str) -> Result<Vec<Vec<f64>>, PipelineError> {
        let r = self.range(observable)?;
        Ok(self.means.iter().map(|m| m.as_slice()[r.clone()].to_vec()).collect())
    }

    /// Means of all observables keyed by name, in output order.
    pub fn mean_by_observable(&self) -> IndexMap<String, Vec<Vec<f64>>> {
        self.layout
            .iter()
            .map(|(name, r)| {
                let rows = self.means.iter().map(|m| m.as_slice()[r.clone()].to_vec()).collect();
                (name.clone(), rows)
            })
            .collect()
    }

    /// Covariance block between two observables, one `n_bins_a × n_bins_b`
    /// matrix per query. `a == b` gives the within-observable block.
    pub fn covariance(&self, a: &str, b: &str) -> Result<Vec<DMatrix<f64>>, PipelineError> {
        let ra = self.range(a)?;
        let rb = self.range(b)?;
        Ok(self
            .covs
            .iter()
            .map(|c| c.view((ra.start, rb.start), (ra.len(), rb.len())).into_owned())
            .collect())
    }

    /// Mean of one observable for a single query.
    pub fn mean_at(&self, query: usize, observable: &str) -> Result<&[f64], PipelineError> {
        let r = self.range(observable)?;
        let m = self.query_mean(query)?;
        Ok(&m.as_slice()[r])
    }

    /// Covariance block between two observables for a single query.
    pub fn covariance_at(&self, query: usize, a: &str, b: &str) -> Result<DMatrix<f64>, PipelineError> {
        let ra = self.range(a)?;
        let rb = self.range(b)?;
        let c = self
            .covs
            .get(query)
            .ok_or_else(|| self.query_out_of_range(query))?;
        Ok(c.view((ra.start, rb.start), (ra.len(), rb.len())).into_owned())
    }

    fn query_mean(&self, query: usize) -> Result<&DVector<f64>, PipelineError> {
        self.means.get(query).ok_or_else(|| self.query_out_of_range(query))
    }

    fn query_out_of_range(&self, query: usize) -> PipelineError {
        PipelineError::Shape(format!("query {query} out of range for {} queries", self.means.len()))
    }

    /// Flattened mean vector of one query.
    pub fn full_mean(&self, query: usize) -> Option<&DVector<f64>> {
        self.means.get(query)
    }

    /// Full output covariance of one query.
    pub fn full_covariance(&self, query: usize) -> Option<&DMatrix<f64>> {
        self.covs.get(query)
    }
}
