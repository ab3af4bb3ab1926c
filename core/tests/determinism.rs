//! Determinism: the same seed must reproduce the same dataset, down to the
//! bytes of the exported CSVs.

use chrono::NaiveDate;
use cryptoops_core::{
    config::{GeneratorConfig, Settings},
    pipeline::Pipeline,
    stage::StageContext,
    stages::GENERATE,
    store::AnalysisRow,
};
use tempfile::TempDir;

fn generate(seed: u64, dir: &TempDir) -> (Vec<AnalysisRow>, Vec<u8>) {
    let settings = Settings {
        data_dir: dir.path().join("processed"),
        viz_dir: dir.path().join("viz"),
        seed,
        ..Settings::default()
    };
    let ctx = StageContext::in_memory(settings, GeneratorConfig::default_test()).expect("context");
    let mut pipeline = Pipeline::build(ctx);
    let report = pipeline.run_one(GENERATE).expect("generate");
    let csv_path = report
        .artifacts
        .iter()
        .find(|p| p.ends_with("transactions.csv"))
        .expect("transactions csv")
        .clone();
    let rows = pipeline
        .context()
        .store
        .analysis_rows(NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"))
        .expect("rows");
    (rows, std::fs::read(csv_path).expect("read csv"))
}

#[test]
fn same_seed_produces_identical_data() {
    let (dir_a, dir_b) = (TempDir::new().unwrap(), TempDir::new().unwrap());
    let (rows_a, csv_a) = generate(42, &dir_a);
    let (rows_b, csv_b) = generate(42, &dir_b);

    assert_eq!(rows_a.len(), rows_b.len());
    for (i, (a, b)) in rows_a.iter().zip(rows_b.iter()).enumerate() {
        assert_eq!(a, b, "Row {i} differs between runs with the same seed");
    }
    assert_eq!(csv_a, csv_b, "Exported CSVs differ between runs with the same seed");
}

#[test]
fn different_seeds_produce_different_data() {
    let (dir_a, dir_b) = (TempDir::new().unwrap(), TempDir::new().unwrap());
    let (rows_a, _) = generate(42, &dir_a);
    let (rows_b, _) = generate(99, &dir_b);

    let any_different = rows_a.iter().zip(rows_b.iter()).any(|(a, b)| a != b);
    assert!(any_different, "Different seeds produced identical data; seed is not being used");
}
