//! Species concentrations and saturation indices from an equilibrium state.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};
use sp_core::{Real, pow10};

/// `Σ_j a_ij log10 c_j` per row, skipping zero coefficients so an absent
/// component (`log10 c = -inf`) only affects the rows that contain it.
fn stoichiometric_log_sum(log_c: &DVector<Real>, stoichiometry: &DMatrix<Real>) -> DVector<Real> {
    DVector::from_fn(stoichiometry.nrows(), |i, _| {
        stoichiometry
            .row(i)
            .iter()
            .zip(log_c.iter())
            .filter(|(a, _)| **a != 0.0)
            .map(|(a, l)| a * l)
            .sum()
    })
}

/// log10 species concentrations: `log β_i + Σ_j a_ij log10 c_j`.
pub fn log_species(log_c: &DVector<Real>, stoichiometry: &DMatrix<Real>, log_beta: &DVector<Real>) -> DVector<Real> {
    stoichiometric_log_sum(log_c, stoichiometry) + log_beta
}

/// Saturation indices `Σ_j b_kj log10 c_j − log Ks_k`.
pub fn saturation_indices(log_c: &DVector<Real>, stoichiometry: &DMatrix<Real>, log_ks: &DVector<Real>) -> DVector<Real> {
    stoichiometric_log_sum(log_c, stoichiometry) - log_ks
}

/// Species concentration matrix from an equilibrium state.
///
/// `state` holds one row per scan point; its first `nc` columns are free
/// component concentrations and any further columns are auxiliary solver
/// values. With `full` the result is `[state | species]`, otherwise only the
/// `ns` species columns.
pub fn species_concentration(
    state: &DMatrix<Real>,
    log_beta: &DVector<Real>,
    stoichiometry: &DMatrix<Real>,
    nc: usize,
    full: bool,
) -> SolverResult<DMatrix<Real>> {
    let ns = log_beta.len();
    if stoichiometry.nrows() != ns || stoichiometry.ncols() != nc || state.ncols() < nc {
        return Err(SolverError::ShapeMismatch {
            what: format!(
                "state {}x{}, stoichiometry {}x{}, {} constants, nc = {}",
                state.nrows(),
                state.ncols(),
                stoichiometry.nrows(),
                stoichiometry.ncols(),
                ns,
                nc
            ),
        });
    }

    let points = state.nrows();
    let offset = if full { state.ncols() } else { 0 };
    let mut out = DMatrix::zeros(points, offset + ns);
    if full {
        out.columns_mut(0, offset).copy_from(state);
    }

    for p in 0..points {
        let log_c = DVector::from_iterator(nc, state.row(p).iter().take(nc).map(|c| c.log10()));
        let log_s = log_species(&log_c, stoichiometry, log_beta);
        for (i, ls) in log_s.iter().enumerate() {
            out[(p, offset + i)] = pow10(*ls);
        }
    }

    Ok(out)
}
