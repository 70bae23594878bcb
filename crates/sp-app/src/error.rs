//! Error types for the sp-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives the CLI one place to report from.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Unknown work mode: '{0}' (expected 'distribution' or 'titration')")]
    UnknownMode(String),

    #[error("Solver input error: {0}")]
    SolverInput(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("No problem loaded")]
    NoProblemLoaded,

    #[error("Failed to read problem file: {path}")]
    ProblemFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sp-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<sp_project::ProjectError> for AppError {
    fn from(err: sp_project::ProjectError) -> Self {
        use sp_project::ProjectError;
        match err {
            ProjectError::Malformed { what } => AppError::MalformedInput(what),
            ProjectError::UnknownMode { mode } => AppError::UnknownMode(mode),
            ProjectError::Json(e) => AppError::MalformedInput(e.to_string()),
            ProjectError::Io(e) => AppError::Io(e),
        }
    }
}

impl From<sp_solver::SolverError> for AppError {
    fn from(err: sp_solver::SolverError) -> Self {
        use sp_solver::SolverError;
        match err {
            SolverError::Input { what } => AppError::SolverInput(what),
            SolverError::ShapeMismatch { what } => AppError::ShapeMismatch(what),
            SolverError::Project(e) => e.into(),
            other => AppError::Solver(other.to_string()),
        }
    }
}

impl From<sp_results::ResultsError> for AppError {
    fn from(err: sp_results::ResultsError) -> Self {
        use sp_results::ResultsError;
        match err {
            ResultsError::ShapeMismatch { what } => AppError::ShapeMismatch(what),
            ResultsError::Io(e) => AppError::Io(e),
            ResultsError::Project(e) => e.into(),
            other => AppError::Results(other.to_string()),
        }
    }
}
