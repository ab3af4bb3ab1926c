//! The five SQL reports and their CSV export.

use cryptoops_core::{
    analysis::sql_reports::{
        export_file_name, export_reports, run_sql_reports, BY_HOUR, FAILURE_REASONS, OVERVIEW,
        PER_CRYPTO, SLOW_TRANSACTIONS,
    },
    config::{AnalyzerConfig, GeneratorConfig, Settings},
    pipeline::Pipeline,
    stage::StageContext,
    stages::GENERATE,
    store::OpsStore,
};
use tempfile::TempDir;

fn generated(dir: &TempDir) -> Pipeline {
    let settings = Settings {
        data_dir: dir.path().to_path_buf(),
        ..Settings::default()
    };
    let ctx = StageContext::in_memory(settings, GeneratorConfig::default_test()).unwrap();
    let mut pipeline = Pipeline::build(ctx);
    pipeline.run_one(GENERATE).unwrap();
    pipeline
}

#[test]
fn reports_run_in_fixed_order() {
    let dir = TempDir::new().unwrap();
    let pipeline = generated(&dir);
    let reports = run_sql_reports(&pipeline.context().store, &AnalyzerConfig::default()).unwrap();
    let titles: Vec<&str> = reports.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec![OVERVIEW, BY_HOUR, SLOW_TRANSACTIONS, PER_CRYPTO, FAILURE_REASONS]);
}

#[test]
fn overview_counts_the_whole_dataset() {
    let dir = TempDir::new().unwrap();
    let pipeline = generated(&dir);
    let config = GeneratorConfig::default_test();
    let reports = run_sql_reports(&pipeline.context().store, &AnalyzerConfig::default()).unwrap();
    let overview = &reports[0];
    assert_eq!(overview.len(), 1);
    assert_eq!(
        overview.cell(0, "total_transactions"),
        Some(config.num_transactions.to_string().as_str())
    );
    let success: i64 = overview.cell(0, "successful_transactions").unwrap().parse().unwrap();
    let failed: i64 = overview.cell(0, "failed_transactions").unwrap().parse().unwrap();
    assert_eq!(success + failed, config.num_transactions as i64);
}

#[test]
fn slow_report_is_sorted_and_capped() {
    let dir = TempDir::new().unwrap();
    let pipeline = generated(&dir);
    let reports = run_sql_reports(&pipeline.context().store, &AnalyzerConfig::default()).unwrap();
    let slow = &reports[2];
    assert!(slow.len() <= 100);
    let times: Vec<i64> = (0..slow.len())
        .map(|i| slow.cell(i, "processing_seconds").unwrap().parse().unwrap())
        .collect();
    assert!(times.iter().all(|t| *t > 300));
    assert!(times.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn by_hour_covers_every_hour_and_failure_shares_sum_to_100() {
    let dir = TempDir::new().unwrap();
    let pipeline = generated(&dir);
    let reports = run_sql_reports(&pipeline.context().store, &AnalyzerConfig::default()).unwrap();
    assert_eq!(reports[1].len(), 24);

    let failures = &reports[4];
    assert!(!failures.is_empty());
    let share: f64 = (0..failures.len())
        .map(|i| failures.cell(i, "share_pct").unwrap().parse::<f64>().unwrap())
        .sum();
    assert!((share - 100.0).abs() < 0.1, "shares sum to {share}");
}

#[test]
fn empty_database_yields_empty_reports_that_are_not_exported() {
    let store = OpsStore::in_memory().unwrap();
    store.migrate().unwrap();
    let reports = run_sql_reports(&store, &AnalyzerConfig::default()).unwrap();
    assert!(reports.iter().all(|r| r.is_empty()));

    let dir = TempDir::new().unwrap();
    let written = export_reports(&reports, dir.path()).unwrap();
    assert!(written.is_empty());
}

#[test]
fn export_writes_one_csv_per_report() {
    let dir = TempDir::new().unwrap();
    let pipeline = generated(&dir);
    let reports = run_sql_reports(&pipeline.context().store, &AnalyzerConfig::default()).unwrap();
    let out = TempDir::new().unwrap();
    let written = export_reports(&reports, out.path()).unwrap();
    assert_eq!(written.len(), 5);
    assert!(out.path().join(export_file_name(PER_CRYPTO)).exists());
    assert_eq!(export_file_name(SLOW_TRANSACTIONS), "analysis_slow_transactions.csv");

    let content = std::fs::read_to_string(out.path().join(export_file_name(OVERVIEW))).unwrap();
    assert!(content.starts_with("total_transactions,active_users"));
}
