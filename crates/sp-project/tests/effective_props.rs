use proptest::prelude::*;
use serde_json::{Map, Value, json};
use sp_project::{ProblemDescriptor, SpeciesTable, effective_species};

fn table(flags: &[bool], prefix: &str, constant: &str) -> Value {
    let mut ignored = Map::new();
    let mut names = Map::new();
    let mut log_k = Map::new();
    let mut coeff = Map::new();
    for (i, flag) in flags.iter().enumerate() {
        let key = i.to_string();
        ignored.insert(key.clone(), json!(flag));
        names.insert(key.clone(), json!(format!("{prefix}{i}")));
        log_k.insert(key.clone(), json!(i as f64 * 0.5));
        coeff.insert(key, json!(1));
    }
    let mut t = Map::new();
    t.insert("Ignored".to_string(), Value::Object(ignored));
    t.insert("Name".to_string(), Value::Object(names));
    t.insert(constant.to_string(), Value::Object(log_k));
    t.insert("X".to_string(), Value::Object(coeff));
    Value::Object(t)
}

fn document(species: &[bool], solids: &[bool]) -> Value {
    json!({
        "compModel": { "Name": {"0": "X"} },
        "speciesModel": table(species, "S", "LogB"),
        "solidSpeciesModel": table(solids, "P", "LogKs"),
        "concModel": { "C0": {"0": 0.001} },
    })
}

fn kept(table: &SpeciesTable) -> Vec<String> {
    effective_species(table).map(|r| r.name.clone()).collect()
}

fn expected(flags: &[bool], prefix: &str) -> Vec<String> {
    flags
        .iter()
        .enumerate()
        .filter(|(_, ignored)| !**ignored)
        .map(|(i, _)| format!("{prefix}{i}"))
        .collect()
}

proptest! {
    #[test]
    fn effective_species_excludes_exactly_the_ignored_rows(
        species in prop::collection::vec(any::<bool>(), 0..12),
        solids in prop::collection::vec(any::<bool>(), 0..6),
    ) {
        let descriptor = ProblemDescriptor::from_value(document(&species, &solids)).unwrap();

        prop_assert_eq!(kept(&descriptor.species), expected(&species, "S"));
        prop_assert_eq!(kept(&descriptor.solids), expected(&solids, "P"));
        prop_assert_eq!(descriptor.species.rows.len(), species.len());
        prop_assert_eq!(descriptor.solids.rows.len(), solids.len());
    }
}
