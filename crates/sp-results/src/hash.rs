//! Content-based hashing for run IDs and result fingerprints.

use crate::ResultsResult;
use crate::types::ComputedTable;
use sha2::{Digest, Sha256};
use sp_project::{ProblemDescriptor, WorkMode};

/// Run ID from the problem, the mode and the solver version.
pub fn compute_run_id(
    descriptor: &ProblemDescriptor,
    mode: WorkMode,
    solver_version: &str,
) -> ResultsResult<String> {
    let mut hasher = Sha256::new();

    let problem_json = serde_json::to_vec(&descriptor.to_value()?)?;
    hasher.update(&problem_json);
    hasher.update(mode.as_str().as_bytes());
    hasher.update(solver_version.as_bytes());

    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint of a computed table over its labels and the exact bit
/// patterns of every value.
pub fn fingerprint(table: &ComputedTable) -> String {
    let mut hasher = Sha256::new();

    hasher.update(table.axis_label.as_bytes());
    hasher.update([0u8]);
    for label in &table.columns {
        hasher.update(label.as_bytes());
        hasher.update([0u8]);
    }
    for x in &table.axis {
        hasher.update(x.to_bits().to_le_bytes());
    }
    for row in &table.data {
        for v in row {
            hasher.update(v.to_bits().to_le_bytes());
        }
    }

    format!("{:x}", hasher.finalize())
}
