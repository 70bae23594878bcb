use sp_results::*;

fn record() -> RunRecord {
    let table = ComputedTable {
        axis_label: "V. add.".to_string(),
        axis: vec![0.0, 0.1, 0.2],
        columns: vec!["Ac".to_string(), "H".to_string(), "AcH".to_string()],
        data: vec![
            vec![4.1e-4, 4.1e-4, 9.59e-3],
            vec![4.6e-4, 3.7e-4, 9.4e-3],
            vec![5.1e-4, 3.3e-4, 9.2e-3],
        ],
    };
    RunRecord {
        run_id: "abc123".to_string(),
        mode: "titration".to_string(),
        solver_version: "0.1.0".to_string(),
        fingerprint: fingerprint(&table),
        table,
    }
}

#[test]
fn save_and_load_run() {
    let temp_dir = std::env::temp_dir().join("sp_results_export_test");
    let _ = std::fs::remove_dir_all(&temp_dir);
    let path = temp_dir.join("runs").join("abc123.json");

    let original = record();
    save_run(&path, &original).unwrap();
    let loaded = load_run(&path).unwrap();

    // values survive bit for bit
    assert_eq!(loaded, original);
    assert_eq!(fingerprint(&loaded.table), original.fingerprint);

    let _ = std::fs::remove_dir_all(&temp_dir);
}

#[test]
fn tampered_run_is_rejected() {
    let temp_dir = std::env::temp_dir().join("sp_results_tamper_test");
    let _ = std::fs::remove_dir_all(&temp_dir);
    let path = temp_dir.join("run.json");

    let mut tampered = record();
    tampered.table.data[1][2] = 1.0;
    save_run(&path, &tampered).unwrap();
    assert!(matches!(load_run(&path), Err(ResultsError::ShapeMismatch { .. })));

    let _ = std::fs::remove_dir_all(&temp_dir);
}

#[test]
fn csv_export_has_axis_and_labels() {
    let temp_dir = std::env::temp_dir().join("sp_results_csv_test");
    let _ = std::fs::remove_dir_all(&temp_dir);
    let path = temp_dir.join("out.csv");

    write_csv(&path, &record().table).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("V. add.,Ac,H,AcH"));
    assert_eq!(lines.count(), 3);

    let _ = std::fs::remove_dir_all(&temp_dir);
}
