//! Read-only views over a loaded problem and a computed result.

use sp_project::{
    COL_A, COL_CG, COL_DG, COL_EG, COL_IGNORED, COL_NAME, COL_REF_COMP, COL_REF_IONIC_STR, COL_SIGMA,
    ModePolicy, ProblemDescriptor, SpeciesTable, WorkMode,
};
use sp_results::ComputedTable;

use crate::error::{AppError, AppResult};

/// A rendered table: headers and stringified cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// All rows of a species table, ignored ones included.
pub fn species_view(table: &SpeciesTable) -> TableView {
    let mut headers: Vec<String> = [
        COL_IGNORED,
        COL_NAME,
        table.kind.constant_column(),
        COL_SIGMA,
        COL_REF_IONIC_STR,
        COL_CG,
        COL_DG,
        COL_EG,
        COL_A,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    headers.extend(table.stoich_columns.iter().cloned());
    headers.push(COL_REF_COMP.to_string());

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let dh = row.debye_huckel;
            let mut cells = vec![
                row.ignored.to_string(),
                row.name.clone(),
                row.log_constant.to_string(),
                row.sigma.to_string(),
                row.ref_ionic_strength.to_string(),
                dh.cg.to_string(),
                dh.dg.to_string(),
                dh.eg.to_string(),
                dh.a.to_string(),
            ];
            cells.extend(row.coefficients.iter().map(|c| c.to_string()));
            cells.push(row.ref_component.clone().unwrap_or_default());
            cells
        })
        .collect();

    TableView { headers, rows }
}

/// Concentration table restricted to the columns visible in `mode`.
pub fn concentration_view(descriptor: &ProblemDescriptor, mode: WorkMode) -> TableView {
    let policy = ModePolicy::for_mode(mode);
    let headers = std::iter::once("Component".to_string())
        .chain(policy.visible_columns.iter().map(|c| c.header().to_string()))
        .collect();
    let names = descriptor.component_names();
    let rows = descriptor
        .concentrations
        .rows
        .iter()
        .zip(names)
        .map(|(row, name)| {
            std::iter::once(name)
                .chain(policy.visible_columns.iter().map(|c| c.value(row).to_string()))
                .collect()
        })
        .collect();
    TableView { headers, rows }
}

/// Summary of a computed table.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub axis_label: String,
    pub axis_range: (f64, f64),
    pub points: usize,
    pub columns: usize,
}

pub fn get_run_summary(table: &ComputedTable) -> AppResult<RunSummary> {
    let (first, last) = match (table.axis.first(), table.axis.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return Err(AppError::Results("computed table has no points".to_string())),
    };
    Ok(RunSummary {
        axis_label: table.axis_label.clone(),
        axis_range: (first, last),
        points: table.rows(),
        columns: table.width(),
    })
}

/// `(axis, value)` pairs of one column, ready for plotting.
pub fn extract_series(table: &ComputedTable, column: &str) -> AppResult<Vec<(f64, f64)>> {
    let values = table.column(column)?;
    Ok(table.axis.iter().copied().zip(values).collect())
}
