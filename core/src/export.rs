//! CSV backups of the generated dataset.

use crate::{
    error::OpsResult,
    hourly_metrics::HourlyMetric,
    transaction_generator::Transaction,
    types::{DATE_FMT, TIMESTAMP_FMT},
    user_generator::User,
};
use std::path::{Path, PathBuf};

pub const USERS_CSV: &str = "users.csv";
pub const TRANSACTIONS_CSV: &str = "transactions.csv";
pub const HOURLY_METRICS_CSV: &str = "hourly_metrics.csv";

const USER_HEADERS: [&str; 9] = [
    "user_id",
    "username",
    "email",
    "registered_at",
    "country",
    "city",
    "verification_level",
    "last_verified_at",
    "account_status",
];

const TRANSACTION_HEADERS: [&str; 25] = [
    "transaction_id",
    "user_id",
    "operation_type",
    "crypto",
    "target_crypto",
    "crypto_amount",
    "unit_price_usd",
    "amount_usd",
    "fee_usd",
    "total_usd",
    "started_at",
    "completed_at",
    "processing_seconds",
    "status",
    "failure_reason",
    "requires_manual_validation",
    "payment_method",
    "network",
    "blockchain_hash",
    "blockchain_confirmations",
    "fraud_score",
    "fraud_flagged",
    "ip_address",
    "user_agent",
    "device",
];

const METRIC_HEADERS: [&str; 20] = [
    "date",
    "hour",
    "txn_count",
    "success_count",
    "failed_count",
    "active_users",
    "mean_processing_seconds",
    "median_processing_seconds",
    "p95_processing_seconds",
    "max_processing_seconds",
    "error_rate_pct",
    "manual_validation_rate_pct",
    "fraud_rate_pct",
    "total_volume_usd",
    "mean_volume_usd",
    "total_fees_usd",
    "buy_count",
    "sell_count",
    "swap_count",
    "withdrawal_count",
];

/// Paths of the three files written by [`export_dataset`].
#[derive(Debug, Clone)]
pub struct ExportedFiles {
    pub users: PathBuf,
    pub transactions: PathBuf,
    pub hourly_metrics: PathBuf,
}

/// Write the three dataset CSVs into `dir`, creating it if missing.
pub fn export_dataset(
    dir: &Path,
    users: &[User],
    txns: &[Transaction],
    metrics: &[HourlyMetric],
) -> OpsResult<ExportedFiles> {
    std::fs::create_dir_all(dir)?;
    let files = ExportedFiles {
        users: dir.join(USERS_CSV),
        transactions: dir.join(TRANSACTIONS_CSV),
        hourly_metrics: dir.join(HOURLY_METRICS_CSV),
    };
    write_rows(&files.users, &USER_HEADERS, users.iter().map(user_record))?;
    write_rows(&files.transactions, &TRANSACTION_HEADERS, txns.iter().map(transaction_record))?;
    write_rows(&files.hourly_metrics, &METRIC_HEADERS, metrics.iter().map(metric_record))?;
    log::info!(
        "CSV backup written to {} ({} users, {} transactions, {} metric rows)",
        dir.display(),
        users.len(),
        txns.len(),
        metrics.len()
    );
    Ok(files)
}

fn write_rows<I>(path: &Path, headers: &[&str], rows: I) -> OpsResult<()>
where
    I: Iterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn user_record(u: &User) -> Vec<String> {
    vec![
        u.user_id.to_string(),
        u.username.clone(),
        u.email.clone(),
        u.registered_at.format(DATE_FMT).to_string(),
        u.country.to_string(),
        u.city.clone(),
        u.verification_level.to_string(),
        u.last_verified_at
            .map(|d| d.format(DATE_FMT).to_string())
            .unwrap_or_default(),
        u.account_status.to_string(),
    ]
}

fn transaction_record(t: &Transaction) -> Vec<String> {
    vec![
        t.transaction_id.to_string(),
        t.user_id.to_string(),
        t.operation_type.to_string(),
        t.crypto.to_string(),
        opt(&t.target_crypto),
        format!("{:.8}", t.crypto_amount),
        format!("{:.2}", t.unit_price_usd),
        format!("{:.2}", t.amount_usd),
        format!("{:.2}", t.fee_usd),
        format!("{:.2}", t.total_usd),
        t.started_at.format(TIMESTAMP_FMT).to_string(),
        t.completed_at.format(TIMESTAMP_FMT).to_string(),
        t.processing_seconds.to_string(),
        t.status.to_string(),
        opt(&t.failure_reason),
        flag(t.requires_manual_validation),
        t.payment_method.to_string(),
        t.network.to_string(),
        opt(&t.blockchain_hash),
        t.blockchain_confirmations.to_string(),
        format!("{:.2}", t.fraud_score),
        flag(t.fraud_flagged),
        t.ip_address.clone(),
        t.user_agent.clone(),
        t.device.to_string(),
    ]
}

fn metric_record(m: &HourlyMetric) -> Vec<String> {
    vec![
        m.date.format(DATE_FMT).to_string(),
        m.hour.to_string(),
        m.txn_count.to_string(),
        m.success_count.to_string(),
        m.failed_count.to_string(),
        m.active_users.to_string(),
        format!("{:.2}", m.mean_processing_seconds),
        format!("{:.2}", m.median_processing_seconds),
        format!("{:.2}", m.p95_processing_seconds),
        m.max_processing_seconds.to_string(),
        format!("{:.2}", m.error_rate_pct),
        format!("{:.2}", m.manual_validation_rate_pct),
        format!("{:.2}", m.fraud_rate_pct),
        format!("{:.2}", m.total_volume_usd),
        format!("{:.2}", m.mean_volume_usd),
        format!("{:.2}", m.total_fees_usd),
        m.buy_count.to_string(),
        m.sell_count.to_string(),
        m.swap_count.to_string(),
        m.withdrawal_count.to_string(),
    ]
}
