//! Error types for solver operations.

use sp_project::ProjectError;
use thiserror::Error;

/// Errors that can occur while building solver input or solving.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Solver input error: {what}")]
    Input { what: String },

    #[error("Shape mismatch: {what}")]
    ShapeMismatch { what: String },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Problem error: {0}")]
    Project(#[from] ProjectError),
}

pub type SolverResult<T> = Result<T, SolverError>;
