//! Result data types.

use crate::{ResultsError, ResultsResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub type RunId = String;

/// Projected concentration table: one row per scan point, free component
/// columns followed by species columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedTable {
    pub axis_label: String,
    pub axis: Vec<f64>,
    pub columns: Vec<String>,
    /// Row-major values, `axis.len()` rows of `columns.len()` values.
    pub data: Vec<Vec<f64>>,
}

impl ComputedTable {
    pub fn rows(&self) -> usize {
        self.data.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of the named column.
    pub fn column(&self, name: &str) -> ResultsResult<Vec<f64>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| ResultsError::ColumnNotFound {
                name: name.to_string(),
            })?;
        Ok(self.data.iter().map(|row| row[idx]).collect())
    }

    /// CSV with a header of the axis label and the column labels.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let header: Vec<String> = std::iter::once(self.axis_label.as_str())
            .chain(self.columns.iter().map(String::as_str))
            .map(csv_field)
            .collect();
        out.push_str(&header.join(","));
        out.push('\n');

        for (x, row) in self.axis.iter().zip(&self.data) {
            let _ = write!(out, "{x}");
            for v in row {
                let _ = write!(out, ",{v:e}");
            }
            out.push('\n');
        }
        out
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// A stored calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub mode: String,
    pub solver_version: String,
    pub fingerprint: String,
    pub table: ComputedTable,
}
