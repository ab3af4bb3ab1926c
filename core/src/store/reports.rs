use super::OpsStore;
use crate::{error::OpsResult, report::ReportTable};
use rusqlite::params;
use std::collections::BTreeMap;

const OVERVIEW_SQL: &str = "
SELECT
    COUNT(*)                                                        AS total_transactions,
    COUNT(DISTINCT user_id)                                         AS active_users,
    SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END)             AS successful_transactions,
    SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END)              AS failed_transactions,
    ROUND(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2)
                                                                    AS error_rate_pct,
    ROUND(SUM(CASE WHEN status = 'success' THEN amount_usd ELSE 0 END), 2)
                                                                    AS total_volume_usd,
    ROUND(AVG(CASE WHEN status = 'success' THEN amount_usd END), 2) AS mean_ticket_usd,
    ROUND(AVG(CASE WHEN status = 'success' THEN processing_seconds END), 2)
                                                                    AS mean_processing_seconds
FROM transactions";

const SLOW_SQL: &str = "
SELECT
    transaction_id,
    user_id,
    operation_type,
    crypto,
    amount_usd,
    processing_seconds,
    started_at,
    status,
    requires_manual_validation
FROM transactions
WHERE processing_seconds > ?1
ORDER BY processing_seconds DESC, transaction_id ASC
LIMIT 100";

const PER_CRYPTO_SQL: &str = "
SELECT
    crypto,
    COUNT(*)                                                                AS txn_count,
    ROUND(SUM(CASE WHEN status = 'success' THEN amount_usd ELSE 0 END), 2)  AS total_volume_usd,
    ROUND(AVG(CASE WHEN status = 'success' THEN processing_seconds END), 2) AS mean_processing_seconds,
    ROUND(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2)
                                                                            AS error_rate_pct
FROM transactions
GROUP BY crypto
ORDER BY total_volume_usd DESC";

const FAILURE_REASONS_SQL: &str = "
SELECT
    failure_reason,
    COUNT(*)                                                AS failure_count,
    ROUND(COUNT(*) * 100.0 / SUM(COUNT(*)) OVER (), 2)      AS share_pct
FROM transactions
WHERE status = 'failed'
GROUP BY failure_reason
ORDER BY failure_count DESC, failure_reason ASC";

/// Settled processing times of one hour of the day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourProcessingTimes {
    pub times: Vec<f64>,
    pub failed: usize,
}

impl OpsStore {
    pub fn overview_report(&self, title: &str) -> OpsResult<ReportTable> {
        let table = self.query_table(title, OVERVIEW_SQL)?;
        // An empty table still yields one row of NULL aggregates.
        if table.cell(0, "total_transactions") == Some("0") {
            return Ok(ReportTable::new(title, table.headers));
        }
        Ok(table)
    }

    pub fn slow_transactions_report(&self, title: &str, threshold_seconds: i64) -> OpsResult<ReportTable> {
        self.query_table_with(title, SLOW_SQL, params![threshold_seconds])
    }

    pub fn per_crypto_report(&self, title: &str) -> OpsResult<ReportTable> {
        self.query_table(title, PER_CRYPTO_SQL)
    }

    pub fn failure_reasons_report(&self, title: &str) -> OpsResult<ReportTable> {
        self.query_table(title, FAILURE_REASONS_SQL)
    }

    /// Success/failed processing times grouped by hour of day, ascending.
    pub fn processing_times_by_hour(&self) -> OpsResult<BTreeMap<u32, HourProcessingTimes>> {
        let mut stmt = self.conn.prepare(
            "SELECT CAST(strftime('%H', started_at) AS INTEGER), processing_seconds, status
             FROM transactions
             WHERE status IN (?1, ?2) AND processing_seconds IS NOT NULL",
        )?;
        let mut by_hour: BTreeMap<u32, HourProcessingTimes> = BTreeMap::new();
        let mut rows = stmt.query(params!["success", "failed"])?;
        while let Some(row) = rows.next()? {
            let hour: u32 = row.get(0)?;
            let seconds: i64 = row.get(1)?;
            let status: String = row.get(2)?;
            let entry = by_hour.entry(hour).or_default();
            entry.times.push(seconds as f64);
            if status == "failed" {
                entry.failed += 1;
            }
        }
        Ok(by_hour)
    }
}
