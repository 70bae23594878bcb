//! Solver input built from a problem descriptor.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};
use sp_core::{ColumnLayout, Real};
use sp_project::{DebyeHuckel, ProblemDescriptor, ScanPlan, SpeciesTable, WorkMode, effective_species};

/// Effective rows of one species table in matrix form.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesSet {
    pub names: Vec<String>,
    /// One row per species, one column per component.
    pub stoichiometry: DMatrix<Real>,
    /// log10 formation constants (soluble) or solubility products (solid).
    pub log_constants: DVector<Real>,
    pub sigma: Vec<Real>,
    pub ref_ionic_strength: Vec<Real>,
    pub debye_huckel: Vec<DebyeHuckel>,
    /// Index of each species' reference component, when given.
    pub ref_components: Vec<Option<usize>>,
}

impl SpeciesSet {
    /// Build from the effective rows of `table`.
    ///
    /// Every non-zero coefficient must name a component in `components`, and
    /// every species must contain at least one component.
    pub fn from_table(table: &SpeciesTable, components: &[String]) -> SolverResult<Self> {
        let context = table.kind.table_key();
        let rows: Vec<_> = effective_species(table).collect();
        let nc = components.len();

        let mut stoichiometry = DMatrix::zeros(rows.len(), nc);
        let mut ref_components = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            for (column, &coeff) in table.stoich_columns.iter().zip(&row.coefficients) {
                if coeff == 0.0 {
                    continue;
                }
                let j = components.iter().position(|c| c == column).ok_or_else(|| {
                    SolverError::Input {
                        what: format!(
                            "{context} species '{}' references undefined component '{column}'",
                            row.name
                        ),
                    }
                })?;
                stoichiometry[(i, j)] = coeff;
            }

            if stoichiometry.row(i).iter().all(|a| *a == 0.0) {
                return Err(SolverError::Input {
                    what: format!("{context} species '{}' has no component coefficients", row.name),
                });
            }

            let ref_component = match &row.ref_component {
                Some(name) => Some(components.iter().position(|c| c == name).ok_or_else(|| {
                    SolverError::Input {
                        what: format!(
                            "{context} species '{}' has undefined reference component '{name}'",
                            row.name
                        ),
                    }
                })?),
                None => None,
            };
            ref_components.push(ref_component);
        }

        Ok(Self {
            names: rows.iter().map(|r| r.name.clone()).collect(),
            stoichiometry,
            log_constants: DVector::from_iterator(rows.len(), rows.iter().map(|r| r.log_constant)),
            sigma: rows.iter().map(|r| r.sigma).collect(),
            ref_ionic_strength: rows.iter().map(|r| r.ref_ionic_strength).collect(),
            debye_huckel: rows.iter().map(|r| r.debye_huckel).collect(),
            ref_components,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Immutable input to one solver call.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverInput {
    pub components: Vec<String>,
    pub soluble: SpeciesSet,
    pub solids: SpeciesSet,
    /// Component names followed by soluble species names (`nc + ns` labels).
    pub species_names: Vec<String>,
    pub scan: ScanPlan,
}

impl SolverInput {
    /// Derive the solver input for `mode`. Fails before any solving when the
    /// stoichiometry cannot be derived or the scan settings are unusable.
    pub fn build(descriptor: &ProblemDescriptor, mode: WorkMode) -> SolverResult<Self> {
        let components = descriptor.component_names();
        let soluble = SpeciesSet::from_table(&descriptor.species, &components)?;
        let solids = SpeciesSet::from_table(&descriptor.solids, &components)?;
        let scan = ScanPlan::from_descriptor(descriptor, mode)?;

        let species_names = components
            .iter()
            .chain(soluble.names.iter())
            .cloned()
            .collect();

        tracing::debug!(
            nc = components.len(),
            ns = soluble.len(),
            nf = solids.len(),
            points = scan.len(),
            mode = %mode,
            "solver input built"
        );

        Ok(Self {
            components,
            soluble,
            solids,
            species_names,
            scan,
        })
    }

    pub fn nc(&self) -> usize {
        self.components.len()
    }

    pub fn ns(&self) -> usize {
        self.soluble.len()
    }

    /// Auxiliary solver columns: one precipitated amount per solid.
    pub fn nf(&self) -> usize {
        self.solids.len()
    }

    pub fn layout(&self) -> ColumnLayout {
        ColumnLayout::new(self.nc(), self.nf(), self.ns())
    }

    pub fn mode(&self) -> WorkMode {
        self.scan.mode()
    }
}
