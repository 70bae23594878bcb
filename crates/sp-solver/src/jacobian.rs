//! Jacobians of the speciation system.
//!
//! Unknowns are `[log10 c_k for solved components | p_t for active solids]`.
//! Rows are the mass balances of the solved components followed by one
//! saturation condition per active solid.

use crate::error::SolverResult;
use nalgebra::{DMatrix, DVector};
use sp_core::{LN_10, Real};

/// Analytic Jacobian.
///
/// * mass row j, log c_k: `ln10 * (δ_jk c_j + Σ_i a_ij a_ik s_i)`
/// * mass row j, p_t: `b_tj`
/// * saturation row t, log c_k: `b_tk`
pub fn speciation_jacobian(
    c: &DVector<Real>,
    species: &DVector<Real>,
    soluble: &DMatrix<Real>,
    solids: &DMatrix<Real>,
    free: &[usize],
    active: &[usize],
) -> DMatrix<Real> {
    let m = free.len();
    let n = m + active.len();
    let mut jac = DMatrix::zeros(n, n);

    for (r, &j) in free.iter().enumerate() {
        for (l, &k) in free.iter().enumerate() {
            let mut d: Real = soluble
                .column(j)
                .iter()
                .zip(soluble.column(k).iter())
                .zip(species.iter())
                .map(|((a_ij, a_ik), s)| a_ij * a_ik * s)
                .sum();
            if j == k {
                d += c[j];
            }
            jac[(r, l)] = LN_10 * d;
        }
        for (q, &t) in active.iter().enumerate() {
            jac[(r, m + q)] = solids[(t, j)];
        }
    }

    for (q, &t) in active.iter().enumerate() {
        for (l, &k) in free.iter().enumerate() {
            jac[(m + q, l)] = solids[(t, k)];
        }
    }

    jac
}

/// Central finite-difference Jacobian, used to check the analytic form.
pub fn central_difference_jacobian<F>(x: &DVector<f64>, f: F, epsilon: f64) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let m = f(x)?.len();
    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let dx = epsilon * x[j].abs().max(1.0);

        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let mut x_minus = x.clone();
        x_minus[j] -= dx;

        let df = (f(&x_plus)? - f(&x_minus)?) / (2.0 * dx);
        jac.set_column(j, &df);
    }

    Ok(jac)
}
