//! Column-oriented tables: `{"<Column>": {"<row>": value, ...}, ...}`.
//!
//! This is the layout a dataframe produces with `to_dict()`. Row keys are
//! either integer-like (ordered numerically) or free-form names (document
//! order is kept).

use crate::{ProjectError, ProjectResult};
use serde_json::{Map, Value};
use sp_core::Real;

#[derive(Debug, Clone)]
pub struct ColumnTable {
    name: &'static str,
    columns: Map<String, Value>,
    row_keys: Vec<String>,
    indexed: bool,
}

impl ColumnTable {
    /// Parse a table. When `key_column` is given, the rows are the keys of
    /// that column; otherwise the union of the keys of every column.
    pub fn parse(name: &'static str, value: &Value, key_column: Option<&str>) -> ProjectResult<Self> {
        let columns = value.as_object().ok_or_else(|| {
            ProjectError::malformed(format!("table '{name}' must be an object of columns"))
        })?;

        for (column, cells) in columns {
            if !cells.is_object() {
                return Err(ProjectError::malformed(format!(
                    "table '{name}' column '{column}' must be an object keyed by row"
                )));
            }
        }

        let mut row_keys: Vec<String> = Vec::new();
        match key_column {
            Some(key) => match columns.get(key).and_then(Value::as_object) {
                Some(cells) => row_keys.extend(cells.keys().cloned()),
                None => {
                    let has_rows = columns
                        .values()
                        .filter_map(Value::as_object)
                        .any(|cells| !cells.is_empty());
                    if has_rows {
                        return Err(ProjectError::malformed(format!(
                            "table '{name}' is missing required column '{key}'"
                        )));
                    }
                }
            },
            None => {
                for cells in columns.values().filter_map(Value::as_object) {
                    for row in cells.keys() {
                        if !row_keys.contains(row) {
                            row_keys.push(row.clone());
                        }
                    }
                }
            }
        }

        let indexed = order_row_keys(&mut row_keys);

        Ok(Self {
            name,
            columns: columns.clone(),
            row_keys,
            indexed,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn row_keys(&self) -> &[String] {
        &self.row_keys
    }

    pub fn len(&self) -> usize {
        self.row_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_keys.is_empty()
    }

    /// True when every row key is an integer index (or the table is empty).
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    fn cell(&self, column: &str, row: &str) -> Option<&Value> {
        self.columns
            .get(column)
            .and_then(Value::as_object)
            .and_then(|cells| cells.get(row))
            .filter(|v| !v.is_null())
    }

    pub fn real(&self, column: &str, row: &str) -> ProjectResult<Option<Real>> {
        match self.cell(column, row) {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| self.bad_cell(column, row, "a number")),
            Some(_) => Err(self.bad_cell(column, row, "a number")),
        }
    }

    pub fn real_or(&self, column: &str, row: &str, default: Real) -> ProjectResult<Real> {
        Ok(self.real(column, row)?.unwrap_or(default))
    }

    pub fn required_real(&self, column: &str, row: &str) -> ProjectResult<Real> {
        self.real(column, row)?.ok_or_else(|| {
            ProjectError::malformed(format!(
                "table '{}' row '{row}' is missing required value '{column}'",
                self.name
            ))
        })
    }

    /// Boolean cell; `0`/`1` are accepted, absent means `false`.
    pub fn flag(&self, column: &str, row: &str) -> ProjectResult<bool> {
        match self.cell(column, row) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => match n.as_f64() {
                Some(v) if v == 0.0 => Ok(false),
                Some(v) if v == 1.0 => Ok(true),
                _ => Err(self.bad_cell(column, row, "a boolean")),
            },
            Some(_) => Err(self.bad_cell(column, row, "a boolean")),
        }
    }

    /// String cell; an empty string reads as absent.
    pub fn text(&self, column: &str, row: &str) -> ProjectResult<Option<String>> {
        match self.cell(column, row) {
            None => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(_) => Err(self.bad_cell(column, row, "a string")),
        }
    }

    fn bad_cell(&self, column: &str, row: &str, expected: &str) -> ProjectError {
        ProjectError::malformed(format!(
            "table '{}' row '{row}' column '{column}' must be {expected}",
            self.name
        ))
    }
}

/// Sort integer-like keys numerically. Returns whether the keys are indexed.
fn order_row_keys(keys: &mut [String]) -> bool {
    let indices: Option<Vec<u64>> = keys.iter().map(|k| k.parse::<u64>().ok()).collect();
    match indices {
        Some(_) => {
            keys.sort_by_key(|k| k.parse::<u64>().unwrap_or(u64::MAX));
            true
        }
        None => false,
    }
}

/// Builds a column-oriented table with rows keyed `"0"`, `"1"`, ...
pub struct ColumnTableWriter {
    rows: usize,
    columns: Map<String, Value>,
}

impl ColumnTableWriter {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            columns: Map::new(),
        }
    }

    pub fn column<I>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let cells: Map<String, Value> = values
            .into_iter()
            .take(self.rows)
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.into()))
            .collect();
        self.columns.insert(name.to_string(), Value::Object(cells));
        self
    }

    pub fn finish(self) -> Value {
        Value::Object(self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_row_keys_are_ordered_numerically() {
        let value = json!({
            "Name": {"10": "c", "2": "b", "0": "a"},
        });
        let table = ColumnTable::parse("t", &value, Some("Name")).unwrap();
        assert_eq!(table.row_keys(), ["0", "2", "10"]);
        assert!(table.is_indexed());
    }

    #[test]
    fn named_row_keys_keep_document_order() {
        let value = json!({
            "C0": {"L": 0.001, "H": 0.002},
            "CT": {"H": -0.1},
        });
        let table = ColumnTable::parse("concModel", &value, None).unwrap();
        assert_eq!(table.row_keys(), ["L", "H"]);
        assert!(!table.is_indexed());
        assert_eq!(table.real_or("CT", "L", 0.0).unwrap(), 0.0);
        assert_eq!(table.real_or("CT", "H", 0.0).unwrap(), -0.1);
    }

    #[test]
    fn missing_key_column_with_rows_is_malformed() {
        let value = json!({ "LogB": {"0": 1.0} });
        let err = ColumnTable::parse("speciesModel", &value, Some("Name")).unwrap_err();
        assert!(matches!(err, ProjectError::Malformed { .. }));
    }

    #[test]
    fn empty_columns_give_empty_table() {
        let value = json!({ "Ignored": {}, "Name": {}, "LogKs": {} });
        let table = ColumnTable::parse("solidSpeciesModel", &value, Some("Name")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn flag_accepts_numbers_and_rejects_strings() {
        let value = json!({ "Name": {"0": "a", "1": "b", "2": "c"}, "Ignored": {"0": 1, "1": false, "2": "yes"} });
        let table = ColumnTable::parse("t", &value, Some("Name")).unwrap();
        assert!(table.flag("Ignored", "0").unwrap());
        assert!(!table.flag("Ignored", "1").unwrap());
        assert!(table.flag("Ignored", "2").is_err());
    }

    #[test]
    fn writer_emits_indexed_rows() {
        let value = ColumnTableWriter::new(2)
            .column("Name", ["a", "b"])
            .column("LogB", [1.5, -2.0])
            .finish();
        assert_eq!(value, json!({ "Name": {"0": "a", "1": "b"}, "LogB": {"0": 1.5, "1": -2.0} }));
    }
}
