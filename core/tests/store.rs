//! Bulk loading, triggers, rollback and reset behaviour of the store.

use chrono::NaiveDate;
use cryptoops_core::{
    config::GeneratorConfig,
    hourly_metrics::{aggregate_hourly, HourlyMetric},
    rng::{RngBank, StreamSlot},
    store::OpsStore,
    transaction_generator::{generate_transactions, Transaction, TxnStreams},
    types::TxnStatus,
    user_generator::{generate_users, User},
};

fn dataset() -> (Vec<User>, Vec<Transaction>, Vec<HourlyMetric>) {
    let config = GeneratorConfig::default_test();
    let bank = RngBank::new(42);
    let mut users_rng = bank.for_stream(StreamSlot::Users);
    let mut identity = bank.for_stream(StreamSlot::Identity);
    let mut main = bank.for_stream(StreamSlot::Transactions);
    let mut network = bank.for_stream(StreamSlot::Network);
    let users = generate_users(&config, &mut users_rng, &mut identity);
    let txns = generate_transactions(
        &users,
        &config,
        TxnStreams {
            main: &mut main,
            network: &mut network,
            identity: &mut identity,
        },
    )
    .unwrap();
    let metrics = aggregate_hourly(&txns);
    (users, txns, metrics)
}

fn loaded_store() -> (OpsStore, Vec<User>, Vec<Transaction>, Vec<HourlyMetric>) {
    let store = OpsStore::in_memory().unwrap();
    store.migrate().unwrap();
    let (users, txns, metrics) = dataset();
    store.insert_users(&users).unwrap();
    store.insert_transactions(&txns).unwrap();
    store.insert_hourly_metrics(&metrics).unwrap();
    (store, users, txns, metrics)
}

fn since_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
}

#[test]
fn migrate_is_idempotent_and_seeds_config() {
    let store = OpsStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.migrate().unwrap();
    assert_eq!(store.config_value("peak_start_hour").unwrap().as_deref(), Some("18"));
    assert_eq!(store.config_value("missing_key").unwrap(), None);
    assert_eq!(store.count_rows("system_config").unwrap(), 6);
}

#[test]
fn bulk_load_stores_every_row() {
    let (store, users, txns, metrics) = loaded_store();
    assert_eq!(store.count_rows("users").unwrap(), users.len() as i64);
    assert_eq!(store.count_rows("transactions").unwrap(), txns.len() as i64);
    assert_eq!(store.count_rows("hourly_metrics").unwrap(), metrics.len() as i64);
}

#[test]
fn stats_trigger_counts_only_successful_transactions() {
    let (store, users, txns, _) = loaded_store();
    for user in users.iter().take(40) {
        let owned: Vec<&Transaction> = txns
            .iter()
            .filter(|t| t.user_id == user.user_id && t.status == TxnStatus::Success)
            .collect();
        let (count, volume) = store.user_stats(user.user_id).unwrap();
        assert_eq!(count, owned.len() as i64, "user {}", user.user_id);
        let expected: f64 = owned.iter().map(|t| t.amount_usd).sum();
        assert!((volume - expected).abs() < 1e-6, "user {}", user.user_id);
    }
}

#[test]
fn analysis_rows_join_owner_level_and_round_trip_fields() {
    let (store, users, txns, _) = loaded_store();
    let rows = store.analysis_rows(since_start()).unwrap();
    assert_eq!(rows.len(), txns.len());
    let first = &rows[0];
    let txn = &txns[0];
    assert_eq!(first.transaction_id, txn.transaction_id);
    assert_eq!(first.started_at, txn.started_at);
    assert_eq!(first.processing_seconds, txn.processing_seconds);
    assert_eq!(first.status, txn.status);
    assert_eq!(first.crypto, txn.crypto);
    assert_eq!(first.requires_manual_validation, txn.requires_manual_validation);
    let owner = users.iter().find(|u| u.user_id == txn.user_id).unwrap();
    assert_eq!(first.verification_level, owner.verification_level);
}

#[test]
fn analysis_rows_respect_the_start_date() {
    let (store, _, txns, _) = loaded_store();
    let since = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
    let rows = store.analysis_rows(since).unwrap();
    let expected = txns.iter().filter(|t| t.started_at.date() >= since).count();
    assert_eq!(rows.len(), expected);
    assert!(rows.iter().all(|r| r.started_at.date() >= since));
}

#[test]
fn optimization_sample_is_limited_and_settled() {
    let (store, _, _, _) = loaded_store();
    let sample = store.optimization_sample(since_start(), 500).unwrap();
    assert_eq!(sample.len(), 500);
    assert!(sample.iter().all(|r| r.is_settled()));
}

#[test]
fn hourly_metrics_round_trip() {
    let (store, _, _, metrics) = loaded_store();
    let stored = store.hourly_metrics().unwrap();
    assert_eq!(stored.len(), metrics.len());
    assert_eq!(stored[0].date, metrics[0].date);
    assert_eq!(stored[0].hour, metrics[0].hour);
    assert_eq!(stored[0].txn_count, metrics[0].txn_count);
}

#[test]
fn duplicate_user_load_rolls_back_entirely() {
    let (store, users, _, _) = loaded_store();
    let before = store.count_rows("users").unwrap();
    assert!(store.insert_users(&users).is_err());
    assert_eq!(store.count_rows("users").unwrap(), before);
}

#[test]
fn failing_transaction_batch_leaves_no_rows() {
    let store = OpsStore::in_memory().unwrap();
    store.migrate().unwrap();
    let (_, txns, _) = dataset();
    // No users loaded: every row violates the owner foreign key.
    assert!(store.insert_transactions(&txns[..10]).is_err());
    assert_eq!(store.count_rows("transactions").unwrap(), 0);
}

#[test]
fn reset_allows_reloading_the_same_dataset() {
    let (store, users, txns, metrics) = loaded_store();
    store.append_log("INFO", "pipeline/generate", "stage started").unwrap();
    store.reset_dataset().unwrap();
    assert_eq!(store.count_rows("users").unwrap(), 0);
    assert_eq!(store.count_rows("transactions").unwrap(), 0);
    assert_eq!(store.count_rows("hourly_metrics").unwrap(), 0);
    // Pipeline log rows are not tied to generated data and survive.
    assert_eq!(store.log_entries().unwrap().len(), 1);
    assert_eq!(store.count_rows("system_config").unwrap(), 6);

    store.insert_users(&users).unwrap();
    store.insert_transactions(&txns).unwrap();
    store.insert_hourly_metrics(&metrics).unwrap();
    assert_eq!(store.count_rows("transactions").unwrap(), txns.len() as i64);
}

#[test]
fn ad_hoc_queries_must_be_read_only() {
    let (store, _, _, _) = loaded_store();
    assert!(store.query_table("bad", "DELETE FROM users").is_err());
    let table = store
        .query_table("statuses", "SELECT status, COUNT(*) AS n FROM transactions GROUP BY status ORDER BY status")
        .unwrap();
    assert_eq!(table.headers, vec!["status".to_string(), "n".to_string()]);
    assert_eq!(table.cell(0, "status"), Some("failed"));
}
