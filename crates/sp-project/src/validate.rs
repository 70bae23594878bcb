//! Problem descriptor validation.
//!
//! Structural consistency only: row counts, name uniqueness, alignment of the
//! concentration table with the component list, and scan settings. Whether a
//! species can be composed from the components is checked when the solver
//! input is built.

use crate::schema::{ProblemDescriptor, SpeciesTable, effective_species};
use crate::{ProjectError, ProjectResult};
use sp_core::{MAX_SCAN_POINTS, ensure_finite, ensure_non_negative, scan_point_count};
use std::collections::HashSet;

pub fn validate_descriptor(descriptor: &ProblemDescriptor) -> ProjectResult<()> {
    let nc = descriptor.nc();

    let mut component_names = HashSet::new();
    for component in &descriptor.components {
        if !component_names.insert(component.name.as_str()) {
            return Err(ProjectError::malformed(format!(
                "duplicate component name '{}'",
                component.name
            )));
        }
    }

    if descriptor.concentrations.len() != nc {
        return Err(ProjectError::malformed(format!(
            "concModel has {} rows but the stoichiometry defines {} components",
            descriptor.concentrations.len(),
            nc
        )));
    }

    if !descriptor.concentrations.indexed {
        for (row, component) in descriptor.concentrations.rows.iter().zip(&descriptor.components) {
            if row.key != component.name {
                return Err(ProjectError::malformed(format!(
                    "concModel row '{}' does not line up with component '{}'",
                    row.key, component.name
                )));
            }
        }
    }

    for row in &descriptor.concentrations.rows {
        ensure_finite(row.c0, "C0")?;
        ensure_finite(row.ct, "CT")?;
        ensure_non_negative(row.sigma_c0, "Sigma C0")?;
        ensure_non_negative(row.sigma_ct, "Sigma CT")?;
    }

    validate_species_table(&descriptor.species)?;
    validate_species_table(&descriptor.solids)?;

    let dist = &descriptor.distribution;
    ensure_finite(dist.initial_log, "initialLog")?;
    ensure_finite(dist.final_log, "finalLog")?;
    if !(dist.log_increment.is_finite() && dist.log_increment > 0.0) {
        return Err(ProjectError::malformed(format!(
            "logInc must be a positive number, got {}",
            dist.log_increment
        )));
    }
    scan_point_count(dist.initial_log, dist.final_log, dist.log_increment)?;
    if nc > 0 && dist.independent_component >= nc {
        return Err(ProjectError::malformed(format!(
            "ind_comp {} is out of range for {} components",
            dist.independent_component, nc
        )));
    }

    if let Some(points) = descriptor.titration.points.filter(|n| *n > MAX_SCAN_POINTS) {
        return Err(ProjectError::malformed(format!(
            "nop {points} exceeds the limit of {MAX_SCAN_POINTS} points"
        )));
    }

    Ok(())
}

fn validate_species_table(table: &SpeciesTable) -> ProjectResult<()> {
    let context = table.kind.table_key();

    let mut names = HashSet::new();
    for row in effective_species(table) {
        if !names.insert(row.name.as_str()) {
            return Err(ProjectError::malformed(format!(
                "duplicate species name '{}' in {context}",
                row.name
            )));
        }
    }

    for row in &table.rows {
        ensure_finite(row.log_constant, table.kind.constant_column())?;
        ensure_non_negative(row.sigma, "Sigma")?;
        for c in &row.coefficients {
            ensure_finite(*c, "stoichiometric coefficient")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::ProjectError;
    use crate::schema::ProblemDescriptor;
    use serde_json::{Value, json};

    fn doc_with(conc: Value) -> Value {
        json!({
            "compModel": { "Name": {"0": "L", "1": "H"} },
            "speciesModel": {
                "Name": {"0": "LH", "1": "OH"},
                "LogB": {"0": 9.0, "1": -13.73},
                "L": {"0": 1, "1": 0},
                "H": {"0": 1, "1": -1},
            },
            "concModel": conc,
        })
    }

    fn assert_malformed(doc: Value) {
        match ProblemDescriptor::from_value(doc) {
            Err(ProjectError::Malformed { .. }) => {}
            other => panic!("expected malformed input, got {other:?}"),
        }
    }

    #[test]
    fn accepts_named_rows_in_component_order() {
        let doc = doc_with(json!({ "C0": {"L": 0.001, "H": 0.002} }));
        assert!(ProblemDescriptor::from_value(doc).is_ok());
    }

    #[test]
    fn rejects_named_rows_out_of_component_order() {
        assert_malformed(doc_with(json!({ "C0": {"H": 0.002, "L": 0.001} })));
    }

    #[test]
    fn rejects_row_count_mismatch() {
        assert_malformed(doc_with(json!({ "C0": {"0": 0.001} })));
    }

    #[test]
    fn rejects_negative_sigma() {
        assert_malformed(doc_with(json!({
            "C0": {"0": 0.001, "1": 0.002},
            "Sigma C0": {"0": -0.1},
        })));
    }

    #[test]
    fn rejects_duplicate_effective_names_but_not_ignored_ones() {
        let dup = json!({
            "speciesModel": {
                "Ignored": {"0": false, "1": false},
                "Name": {"0": "OH", "1": "OH"},
                "LogB": {"0": -13.73, "1": -13.8},
                "H": {"0": -1, "1": -1},
            },
            "concModel": { "C0": {"0": 0.0} },
        });
        assert_malformed(dup.clone());

        let mut ignored = dup;
        ignored["speciesModel"]["Ignored"]["1"] = json!(true);
        assert!(ProblemDescriptor::from_value(ignored).is_ok());
    }

    #[test]
    fn rejects_non_positive_log_increment() {
        let mut doc = doc_with(json!({ "C0": {"0": 0.001, "1": 0.002} }));
        doc["logInc"] = json!(0.0);
        assert_malformed(doc);
    }

    #[test]
    fn rejects_log_increment_too_small_for_the_range() {
        let mut doc = doc_with(json!({ "C0": {"0": 0.001, "1": 0.002} }));
        doc["logInc"] = json!(1e-300);
        assert_malformed(doc);
    }

    #[test]
    fn rejects_titration_point_count_over_limit() {
        let mut doc = doc_with(json!({ "C0": {"0": 0.001, "1": 0.002} }));
        doc["v0"] = json!(20.0);
        doc["vinc"] = json!(0.1);
        doc["nop"] = json!(u64::MAX);
        assert_malformed(doc);
    }

    #[test]
    fn rejects_independent_component_out_of_range() {
        let mut doc = doc_with(json!({ "C0": {"0": 0.001, "1": 0.002} }));
        doc["ind_comp"] = json!(2);
        assert_malformed(doc);
    }
}
