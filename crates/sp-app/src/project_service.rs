//! Problem loading, saving, validation and introspection.

use std::path::Path;

use serde_json::Value;
use sp_project::{ProblemDescriptor, SpeciesTable, effective_species};

use crate::error::{AppError, AppResult};

/// Counts shown after a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemSummary {
    pub components: Vec<String>,
    pub species: usize,
    pub ignored_species: usize,
    pub solids: usize,
    pub ignored_solids: usize,
}

impl ProblemSummary {
    pub fn nc(&self) -> usize {
        self.components.len()
    }
}

/// Load a problem from a JSON file.
pub fn load_problem(path: &Path) -> AppResult<ProblemDescriptor> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ProblemFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| AppError::MalformedInput(format!("invalid JSON in {}: {e}", path.display())))?;
    parse_problem(value)
}

/// Parse and validate a raw problem document.
pub fn parse_problem(value: Value) -> AppResult<ProblemDescriptor> {
    ProblemDescriptor::from_value(value).map_err(|e| {
        tracing::warn!(error = %e, "problem rejected");
        AppError::from(e)
    })
}

/// Save a problem to a JSON file.
pub fn save_problem(path: &Path, descriptor: &ProblemDescriptor) -> AppResult<()> {
    sp_project::save_json(path, descriptor)?;
    Ok(())
}

fn counts(table: &SpeciesTable) -> (usize, usize) {
    let effective = effective_species(table).count();
    (effective, table.rows.len() - effective)
}

pub fn summarize(descriptor: &ProblemDescriptor) -> ProblemSummary {
    let (species, ignored_species) = counts(&descriptor.species);
    let (solids, ignored_solids) = counts(&descriptor.solids);
    ProblemSummary {
        components: descriptor.component_names(),
        species,
        ignored_species,
        solids,
        ignored_solids,
    }
}
