//! Schema verification of migrated and bare databases.

use cryptoops_core::{
    config::Settings,
    error::OpsError,
    pipeline::Pipeline,
    schema_check::{verify_schema, EXPECTED_TABLES},
    stage::StageContext,
    stages::VERIFY_SCHEMA,
    store::OpsStore,
};
use std::path::Path;
use tempfile::TempDir;

fn settings_for(db: &Path) -> Settings {
    Settings {
        db_path: db.to_string_lossy().into_owned(),
        data_dir: db.with_file_name("processed"),
        viz_dir: db.with_file_name("viz"),
        ..Settings::default()
    }
}

/// Verdict line and the (check, missing) pairs of every failed check.
fn verdict_of(ctx: StageContext) -> (String, Vec<(String, String)>) {
    let mut pipeline = Pipeline::build(ctx);
    let report = pipeline.run_one(VERIFY_SCHEMA).unwrap();
    let table = &report.tables[0];
    let failed = (0..table.len())
        .filter(|i| table.cell(*i, "passed") == Some("no"))
        .map(|i| {
            (
                table.cell(i, "check").unwrap_or_default().to_string(),
                table.cell(i, "missing").unwrap_or_default().to_string(),
            )
        })
        .collect();
    (report.lines[0].clone(), failed)
}

#[test]
fn migrated_store_passes_every_check() {
    let store = OpsStore::in_memory().unwrap();
    store.migrate().unwrap();
    let report = verify_schema(&store).unwrap();
    for check in &report.checks {
        assert!(check.passed, "{} failed: {:?}", check.name, check.missing);
    }
    assert!(report.is_valid());
    assert_eq!(report.verdict(), "SCHEMA VALID");
    assert_eq!(report.checks.len(), 6);
}

#[test]
fn smoke_test_leaves_no_rows_behind() {
    let store = OpsStore::in_memory().unwrap();
    store.migrate().unwrap();
    verify_schema(&store).unwrap();
    verify_schema(&store).unwrap();
    assert_eq!(store.count_rows("users").unwrap(), 0);
    assert_eq!(store.count_rows("transactions").unwrap(), 0);
}

#[test]
fn bare_database_is_reported_incomplete() {
    let store = OpsStore::in_memory().unwrap();
    let report = verify_schema(&store).unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.verdict(), "SCHEMA INCOMPLETE");

    let tables = report.check("Tables").unwrap();
    assert_eq!(tables.missing.len(), EXPECTED_TABLES.len());
    let inserts = report.check("Inserts").unwrap();
    assert!(!inserts.passed);
    assert!(!inserts.missing.is_empty());

    let table = report.table();
    assert_eq!(table.cell(0, "passed"), Some("no"));
}

#[test]
fn existing_file_is_verified_as_found() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("partial.db");
    {
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute_batch("CREATE TABLE users (user_id INTEGER PRIMARY KEY);")
            .unwrap();
    }

    let (verdict, failed) = verdict_of(StageContext::open_existing(settings_for(&db)).unwrap());
    assert_eq!(verdict, "SCHEMA INCOMPLETE");
    let names: Vec<&str> = failed.iter().map(|(name, _)| name.as_str()).collect();
    for check in ["Tables", "Views", "Triggers", "Indexes", "Foreign Keys", "Inserts"] {
        assert!(names.contains(&check), "{check} should fail, failed: {names:?}");
    }
    let tables = &failed[0].1;
    assert!(tables.contains("transactions") && !tables.contains("users"), "{tables}");

    // Verification left the file as it was.
    let store = OpsStore::open_existing(&db.to_string_lossy()).unwrap();
    assert_eq!(store.table_names().unwrap().len(), 1);
}

#[test]
fn missing_database_file_is_an_error_not_created() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("absent.db");
    let result = StageContext::open_existing(settings_for(&db));
    assert!(matches!(result, Err(OpsError::DatabaseNotFound { .. })));
    assert!(!db.exists());
}

#[test]
fn migrated_file_is_verified_valid() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("full.db");
    drop(StageContext::open(settings_for(&db)).unwrap());

    let (verdict, failed) = verdict_of(StageContext::open_existing(settings_for(&db)).unwrap());
    assert_eq!(verdict, "SCHEMA VALID", "failed checks: {failed:?}");
    let store = OpsStore::open_existing(&db.to_string_lossy()).unwrap();
    let entries = store.log_entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].1, "pipeline/verify-schema");
}
