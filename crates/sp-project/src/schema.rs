//! Problem document schema and the typed problem descriptor.

use crate::mode::ConcColumn;
use crate::table::{ColumnTable, ColumnTableWriter};
use crate::validate::validate_descriptor;
use crate::{ProjectError, ProjectResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sp_core::Real;

pub const COL_IGNORED: &str = "Ignored";
pub const COL_NAME: &str = "Name";
pub const COL_LOG_BETA: &str = "LogB";
pub const COL_LOG_KS: &str = "LogKs";
pub const COL_SIGMA: &str = "Sigma";
pub const COL_REF_IONIC_STR: &str = "Ref. Ionic Str.";
pub const COL_CG: &str = "CG";
pub const COL_DG: &str = "DG";
pub const COL_EG: &str = "EG";
pub const COL_A: &str = "A";
pub const COL_REF_COMP: &str = "Ref. Comp.";
pub const COL_CHARGE: &str = "Charge";
pub const COL_C0: &str = "C0";
pub const COL_CT: &str = "CT";
pub const COL_SIGMA_C0: &str = "Sigma C0";
pub const COL_SIGMA_CT: &str = "Sigma CT";

pub const DEFAULT_INITIAL_LOG: Real = 1.0;
pub const DEFAULT_FINAL_LOG: Real = 14.0;
pub const DEFAULT_LOG_INCREMENT: Real = 0.1;

/// Raw top-level document. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemDocument {
    #[serde(rename = "speciesModel", default, skip_serializing_if = "Option::is_none")]
    pub species_model: Option<Value>,
    #[serde(rename = "solidSpeciesModel", default, skip_serializing_if = "Option::is_none")]
    pub solid_species_model: Option<Value>,
    #[serde(rename = "concModel", default, skip_serializing_if = "Option::is_none")]
    pub conc_model: Option<Value>,
    #[serde(rename = "compModel", default, skip_serializing_if = "Option::is_none")]
    pub comp_model: Option<Value>,
    #[serde(rename = "initialLog", default, skip_serializing_if = "Option::is_none")]
    pub initial_log: Option<Real>,
    #[serde(rename = "finalLog", default, skip_serializing_if = "Option::is_none")]
    pub final_log: Option<Real>,
    #[serde(rename = "logInc", default, skip_serializing_if = "Option::is_none")]
    pub log_increment: Option<Real>,
    #[serde(rename = "ind_comp", default, skip_serializing_if = "Option::is_none")]
    pub independent_component: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v0: Option<Real>,
    #[serde(rename = "initv", default, skip_serializing_if = "Option::is_none")]
    pub initial_volume: Option<Real>,
    #[serde(rename = "vinc", default, skip_serializing_if = "Option::is_none")]
    pub volume_increment: Option<Real>,
    #[serde(rename = "nop", default, skip_serializing_if = "Option::is_none")]
    pub points: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeciesKind {
    Soluble,
    Solid,
}

impl SpeciesKind {
    pub fn table_key(self) -> &'static str {
        match self {
            SpeciesKind::Soluble => "speciesModel",
            SpeciesKind::Solid => "solidSpeciesModel",
        }
    }

    pub fn constant_column(self) -> &'static str {
        match self {
            SpeciesKind::Soluble => COL_LOG_BETA,
            SpeciesKind::Solid => COL_LOG_KS,
        }
    }

    fn is_fixed_column(self, column: &str) -> bool {
        column == self.constant_column()
            || matches!(
                column,
                COL_IGNORED
                    | COL_NAME
                    | COL_SIGMA
                    | COL_REF_IONIC_STR
                    | COL_CG
                    | COL_DG
                    | COL_EG
                    | COL_A
                    | COL_REF_COMP
            )
    }
}

/// Extended Debye-Hückel parameters of one species.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DebyeHuckel {
    pub cg: Real,
    pub dg: Real,
    pub eg: Real,
    pub a: Real,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesRow {
    pub name: String,
    pub ignored: bool,
    /// log10 of the formation constant (soluble) or solubility product (solid).
    pub log_constant: Real,
    pub sigma: Real,
    pub ref_ionic_strength: Real,
    pub debye_huckel: DebyeHuckel,
    pub ref_component: Option<String>,
    /// Aligned with [`SpeciesTable::stoich_columns`].
    pub coefficients: Vec<Real>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesTable {
    pub kind: SpeciesKind,
    /// Stoichiometric coefficient columns, in document order.
    pub stoich_columns: Vec<String>,
    pub rows: Vec<SpeciesRow>,
}

impl SpeciesTable {
    pub fn empty(kind: SpeciesKind) -> Self {
        Self {
            kind,
            stoich_columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn parse(kind: SpeciesKind, value: &Value) -> ProjectResult<Self> {
        let table = ColumnTable::parse(kind.table_key(), value, Some(COL_NAME))?;
        let stoich_columns: Vec<String> = table
            .column_names()
            .filter(|c| !kind.is_fixed_column(c))
            .map(str::to_string)
            .collect();

        let mut rows = Vec::with_capacity(table.len());
        for key in table.row_keys() {
            let name = table.text(COL_NAME, key)?.ok_or_else(|| {
                ProjectError::malformed(format!("{} row '{key}' has an empty name", kind.table_key()))
            })?;
            let coefficients = stoich_columns
                .iter()
                .map(|c| table.real_or(c, key, 0.0))
                .collect::<ProjectResult<Vec<_>>>()?;
            rows.push(SpeciesRow {
                name,
                ignored: table.flag(COL_IGNORED, key)?,
                log_constant: table.required_real(kind.constant_column(), key)?,
                sigma: table.real_or(COL_SIGMA, key, 0.0)?,
                ref_ionic_strength: table.real_or(COL_REF_IONIC_STR, key, 0.0)?,
                debye_huckel: DebyeHuckel {
                    cg: table.real_or(COL_CG, key, 0.0)?,
                    dg: table.real_or(COL_DG, key, 0.0)?,
                    eg: table.real_or(COL_EG, key, 0.0)?,
                    a: table.real_or(COL_A, key, 0.0)?,
                },
                ref_component: table.text(COL_REF_COMP, key)?,
                coefficients,
            });
        }

        Ok(Self {
            kind,
            stoich_columns,
            rows,
        })
    }

    /// Coefficient of `row` for the stoichiometric column `column` (0 if absent).
    pub fn coefficient(&self, row: &SpeciesRow, column: &str) -> Real {
        self.stoich_columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| row.coefficients.get(i).copied())
            .unwrap_or(0.0)
    }

    /// Owned copy holding only the effective (non-ignored) rows.
    pub fn effective_table(&self) -> SpeciesTable {
        SpeciesTable {
            kind: self.kind,
            stoich_columns: self.stoich_columns.clone(),
            rows: effective_species(self).cloned().collect(),
        }
    }

    pub fn to_value(&self) -> Value {
        let rows = &self.rows;
        let mut writer = ColumnTableWriter::new(rows.len())
            .column(COL_IGNORED, rows.iter().map(|r| r.ignored))
            .column(COL_NAME, rows.iter().map(|r| r.name.clone()))
            .column(self.kind.constant_column(), rows.iter().map(|r| r.log_constant))
            .column(COL_SIGMA, rows.iter().map(|r| r.sigma))
            .column(COL_REF_IONIC_STR, rows.iter().map(|r| r.ref_ionic_strength))
            .column(COL_CG, rows.iter().map(|r| r.debye_huckel.cg))
            .column(COL_DG, rows.iter().map(|r| r.debye_huckel.dg))
            .column(COL_EG, rows.iter().map(|r| r.debye_huckel.eg))
            .column(COL_A, rows.iter().map(|r| r.debye_huckel.a));
        for (i, column) in self.stoich_columns.iter().enumerate() {
            writer = writer.column(column, rows.iter().map(|r| r.coefficients.get(i).copied().unwrap_or(0.0)));
        }
        writer
            .column(COL_REF_COMP, rows.iter().map(|r| r.ref_component.clone()))
            .finish()
    }
}

/// Rows whose ignored flag is false, in original order.
///
/// Every consumer downstream of the model goes through this filter; ignored
/// rows stay in the table so they can be re-enabled later.
pub fn effective_species(table: &SpeciesTable) -> impl Iterator<Item = &SpeciesRow> + '_ {
    table.rows.iter().filter(|row| !row.ignored)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub charge: Option<Real>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationRow {
    /// Row key as found in the document (index or component name).
    pub key: String,
    pub c0: Real,
    pub sigma_c0: Real,
    pub ct: Real,
    pub sigma_ct: Real,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConcentrationTable {
    pub rows: Vec<ConcentrationRow>,
    /// True when row keys are integer indices rather than component names.
    pub indexed: bool,
}

impl ConcentrationTable {
    fn parse(value: &Value) -> ProjectResult<Self> {
        let table = ColumnTable::parse("concModel", value, None)?;
        let rows = table
            .row_keys()
            .iter()
            .map(|key| {
                Ok(ConcentrationRow {
                    key: key.clone(),
                    c0: table.real_or(COL_C0, key, 0.0)?,
                    sigma_c0: table.real_or(COL_SIGMA_C0, key, 0.0)?,
                    ct: table.real_or(COL_CT, key, 0.0)?,
                    sigma_ct: table.real_or(COL_SIGMA_CT, key, 0.0)?,
                })
            })
            .collect::<ProjectResult<Vec<_>>>()?;
        Ok(Self {
            rows,
            indexed: table.is_indexed(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn c0(&self) -> Vec<Real> {
        self.rows.iter().map(|r| r.c0).collect()
    }

    pub fn ct(&self) -> Vec<Real> {
        self.rows.iter().map(|r| r.ct).collect()
    }

    fn to_value(&self, components: &[Component]) -> Value {
        let mut columns = Map::new();
        for column in ConcColumn::ALL {
            let cells: Map<String, Value> = self
                .rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    let key = if self.indexed {
                        i.to_string()
                    } else {
                        components.get(i).map(|c| c.name.clone()).unwrap_or_else(|| row.key.clone())
                    };
                    (key, Value::from(column.value(row)))
                })
                .collect();
            columns.insert(column.header().to_string(), Value::Object(cells));
        }
        Value::Object(columns)
    }
}

/// Distribution-mode scan settings (free-variable pX axis).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributionSettings {
    pub initial_log: Real,
    pub final_log: Real,
    pub log_increment: Real,
    /// Index of the component whose free concentration is scanned.
    pub independent_component: usize,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            initial_log: DEFAULT_INITIAL_LOG,
            final_log: DEFAULT_FINAL_LOG,
            log_increment: DEFAULT_LOG_INCREMENT,
            independent_component: 0,
        }
    }
}

/// Titration-mode settings. Checked only when a titration is actually run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TitrationSettings {
    /// Initial vessel volume.
    pub v0: Option<Real>,
    /// Titrant volume at the first point.
    pub initial_volume: Real,
    pub volume_increment: Option<Real>,
    pub points: Option<usize>,
}

/// Fully parsed speciation problem. Built once per upload, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemDescriptor {
    pub components: Vec<Component>,
    /// True when the component list came from an explicit `compModel`.
    pub declared_components: bool,
    pub species: SpeciesTable,
    pub solids: SpeciesTable,
    pub concentrations: ConcentrationTable,
    pub distribution: DistributionSettings,
    pub titration: TitrationSettings,
}

impl ProblemDescriptor {
    /// Parse and validate a raw JSON document.
    pub fn from_value(value: Value) -> ProjectResult<Self> {
        if !value.is_object() {
            return Err(ProjectError::malformed("problem document must be a JSON object"));
        }
        let doc: ProblemDocument = serde_json::from_value(value)
            .map_err(|e| ProjectError::malformed(format!("invalid problem document: {e}")))?;
        Self::from_document(&doc)
    }

    pub fn from_document(doc: &ProblemDocument) -> ProjectResult<Self> {
        let species_value = doc
            .species_model
            .as_ref()
            .ok_or_else(|| ProjectError::malformed("missing required table 'speciesModel'"))?;
        let conc_value = doc
            .conc_model
            .as_ref()
            .ok_or_else(|| ProjectError::malformed("missing required table 'concModel'"))?;

        let species = SpeciesTable::parse(SpeciesKind::Soluble, species_value)?;
        let solids = match &doc.solid_species_model {
            Some(v) => SpeciesTable::parse(SpeciesKind::Solid, v)?,
            None => SpeciesTable::empty(SpeciesKind::Solid),
        };
        let concentrations = ConcentrationTable::parse(conc_value)?;

        let (components, declared_components) = match &doc.comp_model {
            Some(v) => (parse_components(v)?, true),
            None => (
                species
                    .stoich_columns
                    .iter()
                    .map(|name| Component {
                        name: name.clone(),
                        charge: None,
                    })
                    .collect(),
                false,
            ),
        };

        let defaults = DistributionSettings::default();
        let descriptor = Self {
            components,
            declared_components,
            species,
            solids,
            concentrations,
            distribution: DistributionSettings {
                initial_log: doc.initial_log.unwrap_or(defaults.initial_log),
                final_log: doc.final_log.unwrap_or(defaults.final_log),
                log_increment: doc.log_increment.unwrap_or(defaults.log_increment),
                independent_component: doc
                    .independent_component
                    .unwrap_or(defaults.independent_component),
            },
            titration: TitrationSettings {
                v0: doc.v0,
                initial_volume: doc.initial_volume.unwrap_or(0.0),
                volume_increment: doc.volume_increment,
                points: doc.points,
            },
        };

        validate_descriptor(&descriptor)?;
        tracing::debug!(
            nc = descriptor.nc(),
            species = descriptor.species.rows.len(),
            solids = descriptor.solids.rows.len(),
            "problem descriptor loaded"
        );
        Ok(descriptor)
    }

    /// Number of components.
    pub fn nc(&self) -> usize {
        self.components.len()
    }

    pub fn component_names(&self) -> Vec<String> {
        self.components.iter().map(|c| c.name.clone()).collect()
    }

    pub fn component_index(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name == name)
    }

    /// Serialise back to the column-oriented document layout.
    pub fn to_value(&self) -> ProjectResult<Value> {
        let doc = ProblemDocument {
            species_model: Some(self.species.to_value()),
            solid_species_model: Some(self.solids.to_value()),
            conc_model: Some(self.concentrations.to_value(&self.components)),
            comp_model: self.declared_components.then(|| {
                ColumnTableWriter::new(self.components.len())
                    .column(COL_NAME, self.components.iter().map(|c| c.name.clone()))
                    .column(COL_CHARGE, self.components.iter().map(|c| c.charge))
                    .finish()
            }),
            initial_log: Some(self.distribution.initial_log),
            final_log: Some(self.distribution.final_log),
            log_increment: Some(self.distribution.log_increment),
            independent_component: Some(self.distribution.independent_component),
            v0: self.titration.v0,
            initial_volume: Some(self.titration.initial_volume),
            volume_increment: self.titration.volume_increment,
            points: self.titration.points,
        };
        Ok(serde_json::to_value(doc)?)
    }
}

fn parse_components(value: &Value) -> ProjectResult<Vec<Component>> {
    let table = ColumnTable::parse("compModel", value, Some(COL_NAME))?;
    table
        .row_keys()
        .iter()
        .map(|key| {
            let name = table.text(COL_NAME, key)?.ok_or_else(|| {
                ProjectError::malformed(format!("compModel row '{key}' has an empty name"))
            })?;
            Ok(Component {
                name,
                charge: table.real(COL_CHARGE, key)?,
            })
        })
        .collect()
}
