//! Calculation execution service.

use std::time::Instant;

use sp_core::Real;
use sp_project::{ProblemDescriptor, WorkMode, validate_descriptor};
use sp_results::{ComputedTable, RunRecord, compute_run_id, fingerprint, project};
use sp_solver::{Calculation, EquilibriumSolver, SolverInput, run_calculation};

use crate::error::AppResult;

/// Options for running a calculation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub solver_version: String,
    /// Overrides the document's `initialLog` in distribution mode.
    pub initial_log: Option<Real>,
    /// Overrides the document's `finalLog` in distribution mode.
    pub final_log: Option<Real>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
            initial_log: None,
            final_log: None,
        }
    }
}

/// Request to execute a calculation.
pub struct RunRequest<'a> {
    pub descriptor: &'a ProblemDescriptor,
    pub mode: WorkMode,
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTimingSummary {
    pub build_time_s: f64,
    pub solve_time_s: f64,
    pub project_time_s: f64,
    pub total_time_s: f64,
}

/// Response from a calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResponse {
    pub record: RunRecord,
    /// Precipitated amount and saturation index of every solid, one row per
    /// scan point. `None` when the problem has no solids.
    pub solids: Option<ComputedTable>,
    pub timing: RunTimingSummary,
}

impl RunResponse {
    pub fn run_id(&self) -> &str {
        &self.record.run_id
    }

    pub fn table(&self) -> &ComputedTable {
        &self.record.table
    }
}

fn with_overrides(descriptor: &ProblemDescriptor, options: &RunOptions) -> AppResult<ProblemDescriptor> {
    let mut effective = descriptor.clone();
    if let Some(v) = options.initial_log {
        effective.distribution.initial_log = v;
    }
    if let Some(v) = options.final_log {
        effective.distribution.final_log = v;
    }
    if options.initial_log.is_some() || options.final_log.is_some() {
        validate_descriptor(&effective)?;
    }
    Ok(effective)
}

fn solid_table(input: &SolverInput, calc: &Calculation) -> Option<ComputedTable> {
    if input.nf() == 0 {
        return None;
    }
    let columns = input
        .solids
        .names
        .iter()
        .map(|n| format!("{n} (s)"))
        .chain(input.solids.names.iter().map(|n| format!("SI {n}")))
        .collect();
    let data = (0..calc.concentrations.nrows())
        .map(|p| {
            let mut row = sp_results::project::auxiliary_row(&calc.concentrations, calc.layout, p);
            row.extend(calc.output.saturation_index.row(p).iter().copied());
            row
        })
        .collect();
    Some(ComputedTable {
        axis_label: input.scan.axis_label().to_string(),
        axis: input.scan.axis().to_vec(),
        columns,
        data,
    })
}

/// Build the solver input, solve, and project the result.
///
/// Nothing is cached: equal requests give bit-identical tables.
pub fn run_speciation<S>(request: &RunRequest<'_>, solver: &S) -> AppResult<RunResponse>
where
    S: EquilibriumSolver + ?Sized,
{
    let total_start = Instant::now();

    let build_start = Instant::now();
    let descriptor = with_overrides(request.descriptor, &request.options)?;
    let input = SolverInput::build(&descriptor, request.mode)?;
    let build_time_s = build_start.elapsed().as_secs_f64();

    let solve_start = Instant::now();
    let calc = run_calculation(solver, &input)?;
    let solve_time_s = solve_start.elapsed().as_secs_f64();

    let project_start = Instant::now();
    let table = project(
        &calc.concentrations,
        calc.layout,
        &input.species_names,
        input.scan.axis_label(),
        input.scan.axis(),
    )?;
    let solids = solid_table(&input, &calc);
    let project_time_s = project_start.elapsed().as_secs_f64();

    let record = RunRecord {
        run_id: compute_run_id(&descriptor, request.mode, &request.options.solver_version)?,
        mode: request.mode.to_string(),
        solver_version: request.options.solver_version.clone(),
        fingerprint: fingerprint(&table),
        table,
    };

    let timing = RunTimingSummary {
        build_time_s,
        solve_time_s,
        project_time_s,
        total_time_s: total_start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        run_id = %record.run_id,
        points = record.table.rows(),
        columns = record.table.width(),
        solve_time_s,
        "calculation finished"
    );

    Ok(RunResponse {
        record,
        solids,
        timing,
    })
}
