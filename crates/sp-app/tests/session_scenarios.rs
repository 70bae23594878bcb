//! End-to-end session behaviour.

use nalgebra::{DMatrix, DVector};
use serde_json::{Value, json};
use sp_app::{AppError, Session};
use sp_project::WorkMode;
use sp_solver::{
    EquilibriumSolver, NewtonSpeciationSolver, SolverInput, SolverOutput, SolverResult,
};
use std::cell::Cell;
use std::path::Path;

/// Counts calls before delegating to the bundled solver.
#[derive(Default)]
struct CountingSolver {
    calls: Cell<usize>,
    inner: NewtonSpeciationSolver,
}

impl EquilibriumSolver for CountingSolver {
    fn solve(&self, input: &SolverInput) -> SolverResult<SolverOutput> {
        self.calls.set(self.calls.get() + 1);
        self.inner.solve(input)
    }
}

/// Returns one state column too many.
struct WideSolver;

impl EquilibriumSolver for WideSolver {
    fn solve(&self, input: &SolverInput) -> SolverResult<SolverOutput> {
        let points = input.scan.len();
        Ok(SolverOutput {
            state: DMatrix::from_element(points, input.nc() + input.nf() + 1, 1e-3),
            log_beta: input.soluble.log_constants.clone(),
            log_ks: DVector::zeros(input.nf()),
            saturation_index: DMatrix::zeros(points, input.nf()),
            total_concentration: DMatrix::zeros(points, input.nc()),
        })
    }
}

fn water() -> Value {
    json!({
        "speciesModel": {
            "Name": {"0": "H", "1": "OH"},
            "LogB": {"0": 0.0, "1": -13.73},
            "H": {"0": 1, "1": -1},
        },
        "concModel": { "C0": {"0": 0.0} },
        "initialLog": 1,
        "finalLog": 14,
    })
}

fn demo(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos").join(name)
}

#[test]
fn water_distribution_has_one_labeled_column_per_component_and_species() {
    let mut session = Session::new();
    session.load_document(water()).unwrap();
    let solver = CountingSolver::default();
    let response = session.calculate(&solver).unwrap();

    let table = response.table();
    assert_eq!(table.rows(), 131);
    assert_eq!(table.axis_label, "pX");
    assert_eq!(table.axis[0], 1.0);
    assert!((table.axis[130] - 14.0).abs() < 1e-9);
    assert_eq!(table.columns, vec!["H", "H", "OH"]);
    assert!(table.data.iter().all(|row| row.len() == 3));
    assert!(response.solids.is_none());
    assert_eq!(solver.calls.get(), 1);
}

#[test]
fn malformed_concentrations_never_reach_the_solver() {
    let mut doc = water();
    doc["concModel"] = json!({ "C0": {"0": 0.0, "1": 0.01} });

    let mut session = Session::new();
    let solver = CountingSolver::default();
    assert!(matches!(session.load_document(doc), Err(AppError::MalformedInput(_))));
    assert!(matches!(session.calculate(&solver), Err(AppError::NoProblemLoaded)));
    assert_eq!(solver.calls.get(), 0);
}

#[test]
fn unknown_mode_keeps_tables_and_result() {
    let mut session = Session::new();
    session.load_document(water()).unwrap();
    let solver = CountingSolver::default();
    session.calculate(&solver).unwrap();

    match session.select_mode("foo") {
        Err(AppError::UnknownMode(mode)) => assert_eq!(mode, "foo"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(session.mode(), WorkMode::Distribution);
    assert!(session.species_view().is_some());
    assert!(session.concentration_view().is_some());
    assert!(session.results().is_some());
    assert_eq!(solver.calls.get(), 1);
}

#[test]
fn repeated_calculation_is_bit_identical() {
    let mut session = Session::new();
    session.load_file(&demo("cu_glycine_distribution.json")).unwrap();
    let solver = NewtonSpeciationSolver::default();

    let first = session.calculate(&solver).unwrap().clone();
    let second = session.calculate(&solver).unwrap();
    assert_eq!(first.record.fingerprint, second.record.fingerprint);
    assert_eq!(first.record.table, second.record.table);
    assert_eq!(first.record.run_id, second.record.run_id);
}

#[test]
fn mode_switch_clears_result_but_not_species() {
    let mut session = Session::new();
    session.load_file(&demo("acetic_titration.json")).unwrap();
    let species_before = session.species_view();
    let solver = NewtonSpeciationSolver::default();
    session.calculate(&solver).unwrap();

    session.select_mode("titration").unwrap();
    assert!(session.results().is_none());
    assert_eq!(session.species_view(), species_before);
    assert_eq!(
        session.concentration_view().unwrap().headers,
        vec!["Component", "C0", "CT", "Sigma C0", "Sigma CT"]
    );

    let response = session.calculate(&solver).unwrap();
    assert_eq!(response.table().axis_label, "V. add.");
    assert_eq!(response.table().rows(), 40);

    // selecting the current mode again keeps the result
    session.select_mode("Titration").unwrap();
    assert!(session.results().is_some());
}

#[test]
fn failed_load_drops_previous_problem_and_result() {
    let mut session = Session::new();
    session.load_document(water()).unwrap();
    session.calculate(&NewtonSpeciationSolver::default()).unwrap();

    assert!(session.load_document(json!({ "concModel": {} })).is_err());
    assert!(session.descriptor().is_none());
    assert!(session.results().is_none());
    assert!(session.species_view().is_none());
}

#[test]
fn shape_mismatch_leaves_no_result() {
    let mut session = Session::new();
    session.load_document(water()).unwrap();
    session.calculate(&NewtonSpeciationSolver::default()).unwrap();

    assert!(matches!(session.calculate(&WideSolver), Err(AppError::ShapeMismatch(_))));
    assert!(session.results().is_none());
}

#[test]
fn titration_without_settings_is_malformed() {
    let mut session = Session::new();
    session.load_document(water()).unwrap();
    session.select_mode("titration").unwrap();
    assert!(matches!(
        session.calculate(&NewtonSpeciationSolver::default()),
        Err(AppError::MalformedInput(_))
    ));
}

#[test]
fn scan_bounds_override_the_document() {
    let mut session = Session::new();
    session.load_document(water()).unwrap();
    let solver = NewtonSpeciationSolver::default();
    session.calculate(&solver).unwrap();

    session.set_scan_bounds(Some(2.0), Some(12.0));
    assert!(session.results().is_none());
    let response = session.calculate(&solver).unwrap();
    assert_eq!(response.table().rows(), 101);
    assert_eq!(response.table().axis[0], 2.0);
}

#[test]
fn precipitates_are_reported_beside_the_projection() {
    let mut session = Session::new();
    session.load_file(&demo("calcite_distribution.json")).unwrap();
    let response = session.calculate(&NewtonSpeciationSolver::default()).unwrap();

    // Ca, CO3, H and four soluble species; the solid is not a projected column
    assert_eq!(response.table().width(), 7);
    let solids = response.solids.as_ref().unwrap();
    assert_eq!(solids.columns, vec!["Calcite (s)", "SI Calcite"]);
    assert_eq!(solids.rows(), response.table().rows());
}

#[test]
fn oversized_scans_are_rejected_without_solving() {
    let solver = CountingSolver::default();

    let mut doc = water();
    doc["logInc"] = json!(1e-300);
    let mut session = Session::new();
    assert!(matches!(session.load_document(doc), Err(AppError::MalformedInput(_))));
    assert!(session.descriptor().is_none());

    let mut doc = water();
    doc["v0"] = json!(20.0);
    doc["vinc"] = json!(0.1);
    doc["nop"] = json!(u64::MAX);
    assert!(matches!(session.load_document(doc), Err(AppError::MalformedInput(_))));

    session.load_document(water()).unwrap();
    session.set_scan_bounds(Some(1.0), Some(1e300));
    assert!(matches!(session.calculate(&solver), Err(AppError::MalformedInput(_))));
    assert!(session.results().is_none());
    assert_eq!(solver.calls.get(), 0);
}

#[test]
fn ligand_only_run_of_metal_problem_succeeds() {
    let path = demo("cu_glycine_distribution.json");
    let mut doc: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    doc["concModel"]["C0"]["Cu"] = json!(0.0);

    let mut session = Session::new();
    session.load_document(doc).unwrap();
    let response = session.calculate(&NewtonSpeciationSolver::default()).unwrap();

    let table = response.table();
    for name in ["Cu", "CuGly", "CuGly2"] {
        let series = table.column(name).unwrap();
        assert!(series.iter().all(|c| *c == 0.0), "{name}");
    }
    let gly = table.column("GlyH").unwrap();
    assert!(gly.iter().all(|c| c.is_finite() && *c >= 0.0));
}
