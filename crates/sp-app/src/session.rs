//! Per-user session state: the loaded problem, the work mode and the last
//! result.
//!
//! Each session owns its state and shares nothing. The result is cleared
//! whenever anything it was computed from changes, and on every failed load
//! or calculation, so it never describes a different problem.

use std::path::Path;

use serde_json::Value;
use sp_core::Real;
use sp_project::{ModePolicy, ProblemDescriptor, WorkMode};
use sp_solver::EquilibriumSolver;

use crate::error::{AppError, AppResult};
use crate::project_service;
use crate::query::{self, TableView};
use crate::run_service::{self, RunOptions, RunRequest, RunResponse};

#[derive(Debug, Clone, Default)]
pub struct Session {
    mode: WorkMode,
    descriptor: Option<ProblemDescriptor>,
    options: RunOptions,
    result: Option<RunResponse>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the problem with a parsed document.
    pub fn load_document(&mut self, value: Value) -> AppResult<&ProblemDescriptor> {
        self.result = None;
        self.descriptor = None;
        let descriptor = project_service::parse_problem(value)?;
        Ok(self.descriptor.insert(descriptor))
    }

    /// Replace the problem with the contents of a JSON file.
    pub fn load_file(&mut self, path: &Path) -> AppResult<&ProblemDescriptor> {
        self.result = None;
        self.descriptor = None;
        let descriptor = project_service::load_problem(path)?;
        tracing::debug!(path = %path.display(), nc = descriptor.nc(), "problem loaded");
        Ok(self.descriptor.insert(descriptor))
    }

    /// Switch work mode. An unknown name leaves the session untouched.
    pub fn select_mode(&mut self, name: &str) -> AppResult<WorkMode> {
        let mode: WorkMode = name.parse().map_err(|e| {
            tracing::warn!(mode = name, "unknown work mode");
            AppError::from(e)
        })?;
        if mode != self.mode {
            self.mode = mode;
            self.result = None;
        }
        Ok(mode)
    }

    /// Override the distribution-mode pX bounds for later calculations.
    pub fn set_scan_bounds(&mut self, initial_log: Option<Real>, final_log: Option<Real>) {
        if (initial_log, final_log) != (self.options.initial_log, self.options.final_log) {
            self.options.initial_log = initial_log;
            self.options.final_log = final_log;
            self.result = None;
        }
    }

    /// Run a calculation on the loaded problem in the current mode.
    pub fn calculate<S>(&mut self, solver: &S) -> AppResult<&RunResponse>
    where
        S: EquilibriumSolver + ?Sized,
    {
        self.result = None;
        let descriptor = self.descriptor.as_ref().ok_or(AppError::NoProblemLoaded)?;
        let request = RunRequest {
            descriptor,
            mode: self.mode,
            options: self.options.clone(),
        };
        let response = run_service::run_speciation(&request, solver).map_err(|e| {
            tracing::warn!(error = %e, mode = %self.mode, "calculation failed");
            e
        })?;
        Ok(self.result.insert(response))
    }

    pub fn mode(&self) -> WorkMode {
        self.mode
    }

    pub fn policy(&self) -> ModePolicy {
        ModePolicy::for_mode(self.mode)
    }

    pub fn descriptor(&self) -> Option<&ProblemDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn results(&self) -> Option<&RunResponse> {
        self.result.as_ref()
    }

    pub fn species_view(&self) -> Option<TableView> {
        self.descriptor.as_ref().map(|d| query::species_view(&d.species))
    }

    pub fn solid_species_view(&self) -> Option<TableView> {
        self.descriptor.as_ref().map(|d| query::species_view(&d.solids))
    }

    /// Concentration table with only the columns of the current mode.
    pub fn concentration_view(&self) -> Option<TableView> {
        self.descriptor
            .as_ref()
            .map(|d| query::concentration_view(d, self.mode))
    }
}
