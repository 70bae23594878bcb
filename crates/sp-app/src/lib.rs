//! Application service layer for speciation calculations.
//!
//! Holds the session context used by the CLI: loading problems, choosing
//! the work mode, running calculations and querying the result.

pub mod error;
pub mod project_service;
pub mod query;
pub mod run_service;
pub mod session;

pub use error::{AppError, AppResult};
pub use project_service::{ProblemSummary, load_problem, parse_problem, save_problem, summarize};
pub use query::{RunSummary, TableView, concentration_view, extract_series, get_run_summary, species_view};
pub use run_service::{RunOptions, RunRequest, RunResponse, RunTimingSummary, run_speciation};
pub use session::Session;
