//! sp-project: speciation problem document, model and validation.

pub mod mode;
pub mod schema;
pub mod table;
pub mod validate;

pub use mode::{ConcColumn, ModePolicy, ScanPlan, WorkMode};
pub use schema::*;
pub use validate::validate_descriptor;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Malformed input: {what}")]
    Malformed { what: String },

    #[error("Unknown work mode: '{mode}' (expected 'distribution' or 'titration')")]
    UnknownMode { mode: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProjectError {
    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        ProjectError::Malformed { what: what.into() }
    }
}

impl From<sp_core::CoreError> for ProjectError {
    fn from(e: sp_core::CoreError) -> Self {
        ProjectError::malformed(e.to_string())
    }
}

pub fn from_json_str(content: &str) -> ProjectResult<ProblemDescriptor> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| ProjectError::malformed(format!("invalid JSON document: {e}")))?;
    ProblemDescriptor::from_value(value)
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<ProblemDescriptor> {
    let content = std::fs::read_to_string(path)?;
    from_json_str(&content)
}

pub fn save_json(path: &std::path::Path, descriptor: &ProblemDescriptor) -> ProjectResult<()> {
    validate_descriptor(descriptor)?;
    let content = serde_json::to_string_pretty(&descriptor.to_value()?)?;
    std::fs::write(path, content)?;
    Ok(())
}
