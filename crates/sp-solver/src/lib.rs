//! Equilibrium solver adapter for speciation problems.
//!
//! Builds a stoichiometrically consistent [`SolverInput`] from a problem
//! descriptor, hands it to an [`EquilibriumSolver`], and assembles the full
//! concentration matrix from the solver's equilibrium state. The bundled
//! [`NewtonSpeciationSolver`] works in log10 free-concentration space with a
//! precipitate active set.

pub mod concentration;
pub mod equilibrium;
pub mod error;
pub mod jacobian;
pub mod newton;
pub mod problem;
pub mod solve;

pub use concentration::{saturation_indices, species_concentration};
pub use equilibrium::{EquilibriumSolver, NewtonSpeciationSolver, SolverOutput};
pub use error::{SolverError, SolverResult};
pub use newton::{NewtonConfig, NewtonResult};
pub use problem::{SolverInput, SpeciesSet};
pub use solve::{Calculation, run_calculation};
