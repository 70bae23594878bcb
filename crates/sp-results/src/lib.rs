//! sp-results: projection of solver output into the user-facing
//! concentration table, fingerprints and export.

pub mod export;
pub mod hash;
pub mod project;
pub mod types;

pub use export::{load_run, save_run, to_json_string, write_csv};
pub use hash::{compute_run_id, fingerprint};
pub use project::project;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Problem error: {0}")]
    Project(#[from] sp_project::ProjectError),

    #[error("Shape mismatch: {what}")]
    ShapeMismatch { what: String },

    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },
}
