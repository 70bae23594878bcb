//! Equilibrium solver contract and the bundled Newton speciation solver.
//!
//! Each scan point is solved in log space for the free component
//! concentrations, with one extra unknown per precipitated solid. Solids
//! enter and leave the system through an active-set loop: a solid becomes
//! active once its saturation index exceeds the tolerance and is dropped
//! again when its amount turns negative.
//!
//! A component with a zero total that no species consumes (every coefficient
//! non-negative) is absent at that point: its free concentration is zero,
//! it has no mass balance, and every species or solid containing it is zero.

use crate::concentration::{log_species, saturation_indices};
use crate::error::{SolverError, SolverResult};
use crate::jacobian::speciation_jacobian;
use crate::newton::{NewtonConfig, newton_solve};
use crate::problem::SolverInput;
use nalgebra::{DMatrix, DVector};
use sp_core::{Real, pow10};

/// log10 starting concentration for components without a positive total.
const FALLBACK_LOG_GUESS: Real = -8.0;

/// Raw outputs of one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutput {
    /// `points × (nc + nf)`: free component concentrations, then the
    /// precipitated amount of each solid.
    pub state: DMatrix<Real>,
    /// log10 formation constants of the soluble species used in the solve.
    pub log_beta: DVector<Real>,
    /// log10 solubility products of the solids.
    pub log_ks: DVector<Real>,
    /// `points × nf`
    pub saturation_index: DMatrix<Real>,
    /// `points × nc` total concentrations. For a component whose free
    /// concentration is imposed this is the total implied by the solution.
    pub total_concentration: DMatrix<Real>,
}

/// A speciation solver.
pub trait EquilibriumSolver {
    fn solve(&self, input: &SolverInput) -> SolverResult<SolverOutput>;
}

impl<S: EquilibriumSolver + ?Sized> EquilibriumSolver for &S {
    fn solve(&self, input: &SolverInput) -> SolverResult<SolverOutput> {
        (**self).solve(input)
    }
}

/// Damped Newton speciation solver with a precipitate active set.
#[derive(Debug, Clone)]
pub struct NewtonSpeciationSolver {
    pub newton: NewtonConfig,
    /// Saturation index above which an absent solid is precipitated.
    pub saturation_tol: Real,
}

impl Default for NewtonSpeciationSolver {
    fn default() -> Self {
        Self {
            newton: NewtonConfig::default(),
            saturation_tol: 1e-9,
        }
    }
}

/// Stoichiometry shared by every point of one solve.
struct Model<'a> {
    components: &'a [String],
    soluble: &'a DMatrix<Real>,
    log_beta: &'a DVector<Real>,
    solids: &'a DMatrix<Real>,
    log_ks: &'a DVector<Real>,
    soluble_t: DMatrix<Real>,
    soluble_abs_t: DMatrix<Real>,
    solids_t: DMatrix<Real>,
    solids_abs_t: DMatrix<Real>,
    /// Components that appear with no negative coefficient anywhere.
    never_consumed: Vec<bool>,
}

impl<'a> Model<'a> {
    fn new(input: &'a SolverInput) -> Self {
        let soluble = &input.soluble.stoichiometry;
        let solids = &input.solids.stoichiometry;
        let never_consumed = (0..soluble.ncols())
            .map(|j| {
                soluble.column(j).iter().all(|a| *a >= 0.0) && solids.column(j).iter().all(|b| *b >= 0.0)
            })
            .collect();
        Self {
            components: &input.components,
            soluble,
            log_beta: &input.soluble.log_constants,
            solids,
            log_ks: &input.solids.log_constants,
            soluble_t: soluble.transpose(),
            soluble_abs_t: soluble.abs().transpose(),
            solids_t: solids.transpose(),
            solids_abs_t: solids.abs().transpose(),
            never_consumed,
        }
    }

    fn nc(&self) -> usize {
        self.soluble.ncols()
    }

    fn nf(&self) -> usize {
        self.solids.nrows()
    }
}

/// Split of the components at one scan point.
struct Partition {
    /// Solved for, one mass balance each.
    free: Vec<usize>,
    /// Pinned at zero free concentration.
    absent: Vec<usize>,
}

impl Partition {
    fn at(model: &Model<'_>, totals: &[Real], fixed: Option<usize>) -> SolverResult<Self> {
        let mut free = Vec::new();
        let mut absent = Vec::new();
        for j in (0..model.nc()).filter(|j| Some(*j) != fixed) {
            if !model.never_consumed[j] || totals[j] > 0.0 {
                free.push(j);
            } else if totals[j] == 0.0 {
                absent.push(j);
            } else {
                return Err(SolverError::Input {
                    what: format!(
                        "component '{}' has total {} but no species consumes it",
                        model.components[j], totals[j]
                    ),
                });
            }
        }
        Ok(Self { free, absent })
    }

    /// Whether solid `t` contains an absent component.
    fn excludes_solid(&self, model: &Model<'_>, t: usize) -> bool {
        self.absent.iter().any(|&j| model.solids[(t, j)] != 0.0)
    }
}

/// Concentrations at one iterate.
struct PointState {
    log_c: DVector<Real>,
    c: DVector<Real>,
    species: DVector<Real>,
    amounts: DVector<Real>,
}

/// Nonlinear system of one scan point for a fixed set of active solids.
struct PointSystem<'a> {
    model: &'a Model<'a>,
    totals: &'a [Real],
    fixed: Option<(usize, Real)>,
    free: &'a [usize],
    absent: &'a [usize],
    active: &'a [usize],
}

impl PointSystem<'_> {
    fn size(&self) -> usize {
        self.free.len() + self.active.len()
    }

    fn pack(&self, log_c: &DVector<Real>, amounts: &DVector<Real>) -> DVector<Real> {
        DVector::from_iterator(
            self.size(),
            self.free
                .iter()
                .map(|&j| log_c[j])
                .chain(self.active.iter().map(|&t| amounts[t])),
        )
    }

    fn unpack(&self, x: &DVector<Real>) -> (DVector<Real>, DVector<Real>) {
        let m = self.free.len();
        let mut log_c = DVector::zeros(self.model.nc());
        if let Some((j, value)) = self.fixed {
            log_c[j] = value;
        }
        for &j in self.absent {
            log_c[j] = Real::NEG_INFINITY;
        }
        for (r, &j) in self.free.iter().enumerate() {
            log_c[j] = x[r];
        }
        let mut amounts = DVector::zeros(self.model.nf());
        for (q, &t) in self.active.iter().enumerate() {
            amounts[t] = x[m + q];
        }
        (log_c, amounts)
    }

    fn state(&self, x: &DVector<Real>) -> PointState {
        let (log_c, amounts) = self.unpack(x);
        let c = log_c.map(pow10);
        let species = log_species(&log_c, self.model.soluble, self.model.log_beta).map(pow10);
        PointState {
            log_c,
            c,
            species,
            amounts,
        }
    }

    /// Mass balance of every component: `c_j + Σ a_ij s_i + Σ b_tj p_t`.
    fn analytical(&self, st: &PointState) -> DVector<Real> {
        &st.c + &self.model.soluble_t * &st.species + &self.model.solids_t * &st.amounts
    }

    fn residual(&self, x: &DVector<Real>) -> DVector<Real> {
        let st = self.state(x);
        let m = self.free.len();
        let mass = self.analytical(&st);
        let si = saturation_indices(&st.log_c, self.model.solids, self.model.log_ks);

        let mut r = DVector::zeros(self.size());
        for (row, &j) in self.free.iter().enumerate() {
            r[row] = mass[j] - self.totals[j];
        }
        for (q, &t) in self.active.iter().enumerate() {
            r[m + q] = si[t];
        }
        r
    }

    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let st = self.state(x);
        speciation_jacobian(
            &st.c,
            &st.species,
            self.model.soluble,
            self.model.solids,
            self.free,
            self.active,
        )
    }

    /// Mass rows are scaled by the magnitude of their terms, so the
    /// convergence test is relative whatever the concentration level.
    fn weights(&self, x: &DVector<Real>) -> DVector<Real> {
        let st = self.state(x);
        let bound = &self.model.soluble_abs_t * &st.species;
        let precipitated = &self.model.solids_abs_t * st.amounts.abs();
        DVector::from_iterator(
            self.size(),
            self.free
                .iter()
                .map(|&j| {
                    let scale = self.totals[j].abs() + st.c[j] + bound[j] + precipitated[j];
                    1.0 / scale.max(Real::MIN_POSITIVE)
                })
                .chain(std::iter::repeat_n(1.0, self.active.len())),
        )
    }
}

/// Solution of one scan point, also the starting point of the next.
struct PointSolution {
    log_c: DVector<Real>,
    amounts: DVector<Real>,
    active: Vec<usize>,
}

impl NewtonSpeciationSolver {
    fn solve_point(
        &self,
        model: &Model<'_>,
        totals: &[Real],
        fixed: Option<(usize, Real)>,
        partition: &Partition,
        start: PointSolution,
    ) -> SolverResult<(PointSolution, usize)> {
        let nf = model.nf();
        let PointSolution {
            mut log_c,
            mut amounts,
            mut active,
        } = start;
        if let Some((j, value)) = fixed {
            log_c[j] = value;
        }
        for &j in &partition.absent {
            log_c[j] = Real::NEG_INFINITY;
        }
        // a component that was absent at the previous point needs a fresh start
        for &j in &partition.free {
            if !log_c[j].is_finite() {
                log_c[j] = log_guess(totals[j]);
            }
        }
        active.retain(|t| !partition.excludes_solid(model, *t));
        for t in (0..nf).filter(|t| !active.contains(t)) {
            amounts[t] = 0.0;
        }

        let mut iterations = 0;
        for _ in 0..2 * nf + 2 {
            let system = PointSystem {
                model,
                totals,
                fixed,
                free: &partition.free,
                absent: &partition.absent,
                active: &active,
            };
            let x0 = system.pack(&log_c, &amounts);
            let result = newton_solve(
                x0,
                |x| Ok(system.residual(x)),
                |x| Ok(system.jacobian(x)),
                |x| system.weights(x),
                &self.newton,
            )?;
            iterations += result.iterations;
            (log_c, amounts) = system.unpack(&result.x);

            let dissolved = active
                .iter()
                .enumerate()
                .filter(|(_, t)| amounts[**t] < 0.0)
                .min_by(|a, b| amounts[*a.1].total_cmp(&amounts[*b.1]))
                .map(|(pos, t)| (pos, *t));
            if let Some((pos, t)) = dissolved {
                tracing::trace!(solid = t, amount = amounts[t], "solid dissolved");
                active.remove(pos);
                amounts[t] = 0.0;
                continue;
            }

            let si = saturation_indices(&log_c, model.solids, model.log_ks);
            let supersaturated = (0..nf)
                .filter(|t| !active.contains(t) && si[*t] > self.saturation_tol)
                .max_by(|a, b| si[*a].total_cmp(&si[*b]));
            if let Some(t) = supersaturated {
                tracing::trace!(solid = t, si = si[t], "solid precipitates");
                active.push(t);
                active.sort_unstable();
                amounts[t] = 0.0;
                continue;
            }

            return Ok((
                PointSolution {
                    log_c,
                    amounts,
                    active,
                },
                iterations,
            ));
        }

        Err(SolverError::ConvergenceFailed {
            what: format!("precipitate set did not settle after {} passes", 2 * nf + 2),
        })
    }
}

fn log_guess(total: Real) -> Real {
    if total > 0.0 { total.log10() } else { FALLBACK_LOG_GUESS }
}

fn initial_guess(totals: &[Real]) -> DVector<Real> {
    DVector::from_iterator(totals.len(), totals.iter().map(|t| log_guess(*t)))
}

fn at_point(err: SolverError, point: usize, axis: Real) -> SolverError {
    match err {
        SolverError::ConvergenceFailed { what } => SolverError::ConvergenceFailed {
            what: format!("point {point} (axis {axis}): {what}"),
        },
        SolverError::Numeric { what } => SolverError::Numeric {
            what: format!("point {point} (axis {axis}): {what}"),
        },
        SolverError::Input { what } => SolverError::Input {
            what: format!("point {point} (axis {axis}): {what}"),
        },
        other => other,
    }
}

impl EquilibriumSolver for NewtonSpeciationSolver {
    fn solve(&self, input: &SolverInput) -> SolverResult<SolverOutput> {
        let nc = input.nc();
        let nf = input.nf();
        let points = input.scan.len();

        if nc == 0 {
            return Err(SolverError::Input {
                what: "no components defined".to_string(),
            });
        }
        if points == 0 {
            return Err(SolverError::Input {
                what: "scan has no points".to_string(),
            });
        }
        let fixed_component = input.scan.fixed_component();
        if let Some(j) = fixed_component.filter(|j| *j >= nc) {
            return Err(SolverError::Input {
                what: format!("independent component {j} out of range ({nc} components)"),
            });
        }

        let model = Model::new(input);

        let mut state = DMatrix::zeros(points, nc + nf);
        let mut saturation_index = DMatrix::zeros(points, nf);
        let mut total_concentration = DMatrix::zeros(points, nc);

        let mut previous: Option<PointSolution> = None;
        let mut iterations = 0;

        for (p, &axis) in input.scan.axis().iter().enumerate() {
            let totals = input.scan.totals_at(p);
            let fixed = fixed_component.zip(input.scan.fixed_log_concentration(p));
            let start = previous.take().unwrap_or_else(|| PointSolution {
                log_c: initial_guess(&totals),
                amounts: DVector::zeros(nf),
                active: Vec::new(),
            });

            let (solution, point_iterations) = Partition::at(&model, &totals, fixed_component)
                .and_then(|partition| self.solve_point(&model, &totals, fixed, &partition, start))
                .map_err(|e| at_point(e, p, axis))?;
            iterations += point_iterations;

            let c = solution.log_c.map(pow10);
            let species = log_species(&solution.log_c, model.soluble, model.log_beta).map(pow10);
            let mass = &c + &model.soluble_t * &species + &model.solids_t * &solution.amounts;
            let si = saturation_indices(&solution.log_c, model.solids, model.log_ks);

            for j in 0..nc {
                state[(p, j)] = c[j];
                total_concentration[(p, j)] = if Some(j) == fixed_component {
                    mass[j]
                } else {
                    totals[j]
                };
            }
            for t in 0..nf {
                state[(p, nc + t)] = solution.amounts[t];
                saturation_index[(p, t)] = si[t];
            }

            tracing::debug!(
                point = p,
                axis,
                iterations = point_iterations,
                precipitated = solution.active.len(),
                "point solved"
            );
            previous = Some(solution);
        }

        tracing::info!(points, iterations, "speciation solved");

        Ok(SolverOutput {
            state,
            log_beta: model.log_beta.clone(),
            log_ks: model.log_ks.clone(),
            saturation_index,
            total_concentration,
        })
    }
}
