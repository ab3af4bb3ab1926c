//! The five descriptive SQL reports.

use crate::{
    config::AnalyzerConfig,
    error::OpsResult,
    report::{fmt2, snake_case, ReportTable},
    stats,
    store::OpsStore,
};
use std::path::{Path, PathBuf};

pub const OVERVIEW: &str = "Overview";
pub const BY_HOUR: &str = "By Hour";
pub const SLOW_TRANSACTIONS: &str = "Slow Transactions";
pub const PER_CRYPTO: &str = "Per Crypto";
pub const FAILURE_REASONS: &str = "Failure Reasons";

/// Rows printed per report.
pub const PREVIEW_ROWS: usize = 10;

/// Run all five reports in their fixed order.
pub fn run_sql_reports(store: &OpsStore, config: &AnalyzerConfig) -> OpsResult<Vec<ReportTable>> {
    let reports = vec![
        store.overview_report(OVERVIEW)?,
        by_hour_report(store)?,
        store.slow_transactions_report(SLOW_TRANSACTIONS, config.slow_threshold_seconds)?,
        store.per_crypto_report(PER_CRYPTO)?,
        store.failure_reasons_report(FAILURE_REASONS)?,
    ];
    for r in &reports {
        log::info!("report '{}' returned {} rows", r.title, r.len());
    }
    Ok(reports)
}

/// Per hour of day: count, mean and p95 time, error rate. Settled rows only.
pub fn by_hour_report(store: &OpsStore) -> OpsResult<ReportTable> {
    let mut table = ReportTable::new(
        BY_HOUR,
        [
            "hour",
            "txn_count",
            "mean_processing_seconds",
            "p95_processing_seconds",
            "error_rate_pct",
        ],
    );
    for (hour, bucket) in store.processing_times_by_hour()? {
        let n = bucket.times.len();
        table.push([
            hour.to_string(),
            n.to_string(),
            fmt2(stats::mean(&bucket.times).unwrap_or(0.0)),
            fmt2(stats::quantile(&bucket.times, 0.95).unwrap_or(0.0)),
            fmt2(stats::pct(bucket.failed, n)),
        ]);
    }
    Ok(table)
}

/// File name a report exports to: `analysis_<snake title>.csv`.
pub fn export_file_name(title: &str) -> String {
    format!("analysis_{}.csv", snake_case(title))
}

/// Export every non-empty report into `dir`.
pub fn export_reports(reports: &[ReportTable], dir: &Path) -> OpsResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for r in reports {
        if r.is_empty() {
            log::warn!("report '{}' is empty, not exported", r.title);
            continue;
        }
        written.push(r.write_csv(&dir.join(export_file_name(&r.title)))?);
    }
    Ok(written)
}
