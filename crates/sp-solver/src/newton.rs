//! Damped Newton solver with weighted residual norm.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};

/// Newton solver configuration.
#[derive(Debug, Clone)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for the weighted residual norm
    pub abs_tol: f64,
    /// Largest allowed change of any unknown in one step
    pub max_step: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            abs_tol: 1e-10,
            max_step: 1.0,
            line_search_beta: 0.5,
            max_line_search_iters: 30,
        }
    }
}

/// Newton iteration result.
#[derive(Debug, Clone)]
pub struct NewtonResult {
    /// Solution vector
    pub x: DVector<f64>,
    /// Final weighted residual norm
    pub residual_norm: f64,
    /// Number of iterations
    pub iterations: usize,
    /// Converged flag
    pub converged: bool,
}

fn weighted_norm(r: &DVector<f64>, w: &DVector<f64>) -> f64 {
    r.component_mul(w).norm()
}

/// Newton solver with step capping and backtracking line search.
///
/// `weight_fn` returns positive per-row weights. Convergence is tested on the
/// weighted norm at the current iterate; during a line search the weights of
/// the iterate the step started from are kept fixed, which keeps the Newton
/// direction a descent direction for the merit function.
pub fn newton_solve<F, J, W>(
    x0: DVector<f64>,
    residual_fn: F,
    jacobian_fn: J,
    weight_fn: W,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
    J: Fn(&DVector<f64>) -> SolverResult<DMatrix<f64>>,
    W: Fn(&DVector<f64>) -> DVector<f64>,
{
    let mut x = x0;
    let mut r = residual_fn(&x)?;

    for iter in 0..config.max_iterations {
        let w = weight_fn(&x);
        let r_norm = weighted_norm(&r, &w);
        if !r_norm.is_finite() {
            return Err(SolverError::Numeric {
                what: format!("non-finite residual at iteration {}", iter),
            });
        }

        // Check convergence
        if r_norm < config.abs_tol {
            return Ok(NewtonResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
                converged: true,
            });
        }

        // Solve J * dx = -r
        let jac = jacobian_fn(&x)?;
        let mut dx = jac
            .lu()
            .solve(&(-r.clone()))
            .ok_or_else(|| SolverError::Numeric {
                what: "Jacobian solve failed".to_string(),
            })?;

        let largest = dx.amax();
        if largest > config.max_step {
            dx *= config.max_step / largest;
        }

        // Backtrack until the weighted residual decreases
        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..config.max_line_search_iters {
            let x_new = &x + alpha * &dx;
            let r_new = residual_fn(&x_new)?;
            let r_new_norm = weighted_norm(&r_new, &w);
            if r_new_norm.is_finite() && r_new_norm < r_norm {
                accepted = Some((x_new, r_new));
                break;
            }
            alpha *= config.line_search_beta;
        }

        match accepted {
            Some((x_new, r_new)) => {
                x = x_new;
                r = r_new;
            }
            None => {
                return Err(SolverError::ConvergenceFailed {
                    what: format!(
                        "Line search stagnated at iteration {}, residual = {:e}",
                        iter, r_norm
                    ),
                });
            }
        }
    }

    let r_norm = weighted_norm(&r, &weight_fn(&x));
    if r_norm < config.abs_tol {
        return Ok(NewtonResult {
            x,
            residual_norm: r_norm,
            iterations: config.max_iterations,
            converged: true,
        });
    }

    Err(SolverError::ConvergenceFailed {
        what: format!(
            "Maximum iterations {} reached, residual = {:e}",
            config.max_iterations, r_norm
        ),
    })
}
