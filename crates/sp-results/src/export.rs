//! Writing and reading calculation results.

use crate::types::{ComputedTable, RunRecord};
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::Path;

fn ensure_parent(path: &Path) -> ResultsResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn write_csv(path: &Path, table: &ComputedTable) -> ResultsResult<()> {
    ensure_parent(path)?;
    fs::write(path, table.to_csv())?;
    Ok(())
}

pub fn to_json_string(record: &RunRecord) -> ResultsResult<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

pub fn save_run(path: &Path, record: &RunRecord) -> ResultsResult<()> {
    ensure_parent(path)?;
    fs::write(path, to_json_string(record)?)?;
    Ok(())
}

/// Load a saved run. The stored fingerprint must match the table.
pub fn load_run(path: &Path) -> ResultsResult<RunRecord> {
    let content = fs::read_to_string(path)?;
    let record: RunRecord = serde_json::from_str(&content)?;

    let rows = record.table.rows();
    if record.table.axis.len() != rows
        || record.table.data.iter().any(|r| r.len() != record.table.width())
    {
        return Err(ResultsError::ShapeMismatch {
            what: format!("stored table in {} is ragged", path.display()),
        });
    }
    if crate::hash::fingerprint(&record.table) != record.fingerprint {
        return Err(ResultsError::ShapeMismatch {
            what: format!("stored fingerprint in {} does not match its table", path.display()),
        });
    }

    Ok(record)
}
