//! Design, range and label file loading.
//!
//! Design files are CSV with a header row: an optional `idx` column followed by
//! one column per model parameter. Range files carry `min`/`max` columns, one
//! row per parameter. Label files list one parameter label per line.
//!
//! Loading is strict: a malformed row is a `Parse` error naming the line, never
//! a silently skipped point.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::error::PipelineError;

/// A loaded design matrix with its column labels and point indices.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignTable {
    /// Parameter labels in column order (the `idx` column excluded).
    pub labels: Vec<String>,
    /// Design point index per row (`idx` column, or the row number if absent).
    pub idx: Vec<usize>,
    pub rows: Vec<Vec<f64>>,
}

impl DesignTable {
    pub fn n_points(&self) -> usize {
        self.rows.len()
    }

    /// Drop the rows whose design index appears in `remove`.
    pub fn without_points(&self, remove: &[usize]) -> DesignTable {
        let (idx, rows): (Vec<usize>, Vec<Vec<f64>>) = self
            .idx
            .iter()
            .zip(&self.rows)
            .filter(|(i, _)| !remove.contains(i))
            .map(|(i, r)| (*i, r.clone()))
            .unzip();
        DesignTable {
            labels: self.labels.clone(),
            idx,
            rows,
        }
    }
}

fn open_csv(path: &Path) -> Result<csv::Reader<File>, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

pub(crate) fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name).to_ascii_lowercase(), idx))
        .collect()
}

fn parse_f64(path: &Path, line: usize, column: &str, value: &str) -> Result<f64, PipelineError> {
    value.parse::<f64>().map_err(|e| {
        PipelineError::parse(path, format!("line {line}, column '{column}': invalid number '{value}': {e}"))
    })
}

/// Load a design-point file.
pub fn load_design(path: &Path) -> Result<DesignTable, PipelineError> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers().map_err(|e| PipelineError::parse(path, e))?.clone();
    let idx_col = build_header_map(&headers).get("idx").copied();

    let param_cols: Vec<usize> = (0..headers.len()).filter(|c| Some(*c) != idx_col).collect();
    let labels: Vec<String> = param_cols
        .iter()
        .map(|&c| normalize_header_name(&headers[c]))
        .collect();

    let mut idx = Vec::new();
    let mut rows = Vec::new();
    for (n, result) in reader.records().enumerate() {
        let line = n + 2;
        let record = result.map_err(|e| PipelineError::parse(path, format!("line {line}: {e}")))?;

        let point = match idx_col {
            Some(c) => {
                let raw = record.get(c).unwrap_or_default();
                // Some writers store the index as a float ("12.0").
                let v = parse_f64(path, line, "idx", raw)?;
                if v < 0.0 || v.fract() != 0.0 {
                    return Err(PipelineError::parse(path, format!("line {line}: invalid design index '{raw}'")));
                }
                v as usize
            }
            None => n,
        };

        let row = param_cols
            .iter()
            .zip(&labels)
            .map(|(&c, label)| parse_f64(path, line, label, record.get(c).unwrap_or_default()))
            .collect::<Result<Vec<_>, _>>()?;

        idx.push(point);
        rows.push(row);
    }

    debug!(path = %path.display(), points = rows.len(), columns = labels.len(), "design loaded");
    Ok(DesignTable { labels, idx, rows })
}

/// Load a parameter range file as `(min, max)` per parameter.
pub fn load_ranges(path: &Path) -> Result<Vec<(f64, f64)>, PipelineError> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers().map_err(|e| PipelineError::parse(path, e))?.clone();
    let header_map = build_header_map(&headers);
    let (Some(&min_col), Some(&max_col)) = (header_map.get("min"), header_map.get("max")) else {
        return Err(PipelineError::parse(path, "range file needs `min` and `max` columns"));
    };

    let mut out = Vec::new();
    for (n, result) in reader.records().enumerate() {
        let line = n + 2;
        let record = result.map_err(|e| PipelineError::parse(path, format!("line {line}: {e}")))?;
        let min = parse_f64(path, line, "min", record.get(min_col).unwrap_or_default())?;
        let max = parse_f64(path, line, "max", record.get(max_col).unwrap_or_default())?;
        if min > max {
            return Err(PipelineError::parse(path, format!("line {line}: min {min} > max {max}")));
        }
        out.push((min, max));
    }
    Ok(out)
}

/// Load a label file. A missing file is not fatal: it is logged and `None` returned.
pub fn load_labels(path: &Path) -> Result<Option<Vec<String>>, PipelineError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "design label file not found; using positional columns");
            return Ok(None);
        }
        Err(e) => return Err(PipelineError::io(path, e)),
    };
    let labels = text
        .lines()
        .map(normalize_header_name)
        .filter(|l| !l.is_empty())
        .collect();
    Ok(Some(labels))
}
