//! High-level calculation entry point.

use crate::concentration::species_concentration;
use crate::equilibrium::{EquilibriumSolver, SolverOutput};
use crate::error::{SolverError, SolverResult};
use crate::problem::SolverInput;
use nalgebra::DMatrix;
use sp_core::{ColumnLayout, Real};

/// A finished calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    /// Solver outputs exactly as returned.
    pub output: SolverOutput,
    /// `points × (nc + nf + ns)` concentration matrix laid out per `layout`.
    pub concentrations: DMatrix<Real>,
    pub layout: ColumnLayout,
}

fn expect_shape(what: &str, actual: (usize, usize), expected: (usize, usize)) -> SolverResult<()> {
    if actual != expected {
        return Err(SolverError::ShapeMismatch {
            what: format!(
                "{what} is {}x{}, expected {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
        });
    }
    Ok(())
}

/// Run `solver` on `input` and assemble the full concentration matrix.
///
/// Output dimensions are checked against the input's `nc`, `nf`, `ns` and
/// point count before anything is derived from them.
pub fn run_calculation<S>(solver: &S, input: &SolverInput) -> SolverResult<Calculation>
where
    S: EquilibriumSolver + ?Sized,
{
    let layout = input.layout();
    let points = input.scan.len();
    let (nc, nf, ns) = (layout.nc, layout.nf, layout.ns);

    tracing::info!(nc, nf, ns, points, mode = %input.mode(), "running calculation");

    let output = solver.solve(input)?;

    expect_shape("equilibrium state", output.state.shape(), (points, nc + nf))?;
    expect_shape("formation constants", (output.log_beta.len(), 1), (ns, 1))?;
    expect_shape("solubility products", (output.log_ks.len(), 1), (nf, 1))?;
    expect_shape("saturation indices", output.saturation_index.shape(), (points, nf))?;
    expect_shape("total concentrations", output.total_concentration.shape(), (points, nc))?;

    let concentrations = species_concentration(
        &output.state,
        &output.log_beta,
        &input.soluble.stoichiometry,
        nc,
        true,
    )?;
    expect_shape("concentration matrix", concentrations.shape(), (points, layout.width()))?;

    Ok(Calculation {
        output,
        concentrations,
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equilibrium::NewtonSpeciationSolver;
    use nalgebra::DVector;
    use serde_json::json;
    use sp_project::{ProblemDescriptor, WorkMode};

    fn water_input() -> SolverInput {
        let descriptor = ProblemDescriptor::from_value(json!({
            "compModel": { "Name": {"0": "H"} },
            "speciesModel": {
                "Name": {"0": "OH"},
                "LogB": {"0": -14.0},
                "H": {"0": -1},
            },
            "concModel": { "C0": {"0": 0.0} },
            "initialLog": 2.0,
            "finalLog": 4.0,
            "logInc": 1.0,
        }))
        .unwrap();
        SolverInput::build(&descriptor, WorkMode::Distribution).unwrap()
    }

    /// Returns a canned output regardless of input.
    struct Canned(SolverOutput);

    impl EquilibriumSolver for Canned {
        fn solve(&self, _: &SolverInput) -> SolverResult<SolverOutput> {
            Ok(self.0.clone())
        }
    }

    fn canned_water(points: usize, extra_state_cols: usize) -> Canned {
        let mut state = DMatrix::zeros(points, 1 + extra_state_cols);
        for p in 0..points {
            state[(p, 0)] = 10f64.powi(-(p as i32) - 2);
        }
        Canned(SolverOutput {
            state,
            log_beta: DVector::from_vec(vec![-14.0]),
            log_ks: DVector::zeros(0),
            saturation_index: DMatrix::zeros(points, 0),
            total_concentration: DMatrix::zeros(points, 1),
        })
    }

    #[test]
    fn outputs_pass_through_unmodified() {
        let solver = canned_water(3, 0);
        let calc = run_calculation(&solver, &water_input()).unwrap();
        assert_eq!(calc.output, solver.0);
        assert_eq!(calc.layout, ColumnLayout::new(1, 0, 1));
        assert_eq!(calc.concentrations.shape(), (3, 2));
        assert_eq!(calc.concentrations[(0, 0)], calc.output.state[(0, 0)]);
    }

    #[test]
    fn extra_state_columns_are_a_shape_mismatch() {
        let solver = canned_water(3, 1);
        assert!(matches!(
            run_calculation(&solver, &water_input()),
            Err(SolverError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn missing_points_are_a_shape_mismatch() {
        let solver = canned_water(2, 0);
        match run_calculation(&solver, &water_input()) {
            Err(SolverError::ShapeMismatch { what }) => assert!(what.contains("equilibrium state"), "{what}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bundled_solver_through_trait_object() {
        let solver: Box<dyn EquilibriumSolver> = Box::new(NewtonSpeciationSolver::default());
        let calc = run_calculation(solver.as_ref(), &water_input()).unwrap();
        // OH = Kw / H at pH 3
        let (h, oh) = (calc.concentrations[(1, 0)], calc.concentrations[(1, 1)]);
        assert!((h * oh / 1e-14 - 1.0).abs() < 1e-9);
    }
}
