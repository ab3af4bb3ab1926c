use super::{parse_text, parse_timestamp, AnalysisRow, OpsStore};
use crate::{
    error::OpsResult,
    hourly_metrics::HourlyMetric,
    transaction_generator::Transaction,
    types::{DATE_FMT, TIMESTAMP_FMT},
    user_generator::User,
};
use chrono::NaiveDate;
use rusqlite::{params, Row};

/// Transactions committed per SQL transaction during bulk loads.
pub const TRANSACTION_BATCH_SIZE: usize = 5_000;

const ANALYSIS_COLUMNS: &str = "t.transaction_id, t.user_id, t.operation_type, t.crypto,
    t.amount_usd, t.fee_usd, t.started_at, t.processing_seconds, t.status,
    t.failure_reason, t.requires_manual_validation, t.payment_method,
    t.fraud_score, u.verification_level";

impl OpsStore {
    // ── Dataset lifecycle ─────────────────────────────────────────

    /// Remove every generated row so the dataset can be reloaded.
    /// `system_config` and log rows not tied to a user or transaction
    /// are left untouched.
    pub fn reset_dataset(&self) -> OpsResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM validations;
             DELETE FROM system_logs WHERE transaction_id IS NOT NULL OR user_id IS NOT NULL;
             DELETE FROM hourly_metrics;
             DELETE FROM transactions;
             DELETE FROM users;",
        )?;
        tx.commit()?;
        log::info!("dataset tables cleared");
        Ok(())
    }

    pub fn insert_users(&self, users: &[User]) -> OpsResult<usize> {
        let result = (|| -> OpsResult<usize> {
            let tx = self.conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO users (
                        user_id, username, email, registered_at, country, city,
                        verification_level, last_verified_at, account_status
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;
                for u in users {
                    stmt.execute(params![
                        u.user_id,
                        u.username,
                        u.email,
                        u.registered_at.format(DATE_FMT).to_string(),
                        u.country.as_str(),
                        u.city,
                        u.verification_level.as_str(),
                        u.last_verified_at.map(|d| d.format(DATE_FMT).to_string()),
                        u.account_status.as_str(),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(users.len())
        })();
        if let Err(e) = &result {
            log::error!("user load rolled back: {e}");
        }
        result
    }

    /// Insert in batches of [`TRANSACTION_BATCH_SIZE`], one SQL transaction
    /// per batch. A failing batch is rolled back; earlier batches stay.
    pub fn insert_transactions(&self, txns: &[Transaction]) -> OpsResult<usize> {
        let mut inserted = 0;
        for (batch_no, batch) in txns.chunks(TRANSACTION_BATCH_SIZE).enumerate() {
            if let Err(e) = self.insert_transaction_batch(batch) {
                log::error!("transaction batch {batch_no} rolled back: {e}");
                return Err(e);
            }
            inserted += batch.len();
            log::debug!("{inserted}/{} transactions loaded", txns.len());
        }
        Ok(inserted)
    }

    fn insert_transaction_batch(&self, batch: &[Transaction]) -> OpsResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions (
                    transaction_id, user_id, operation_type, crypto, target_crypto,
                    crypto_amount, unit_price_usd, amount_usd, fee_usd, total_usd,
                    started_at, completed_at, processing_seconds, status, failure_reason,
                    requires_manual_validation, payment_method, network, blockchain_hash,
                    blockchain_confirmations, fraud_score, fraud_flagged, ip_address,
                    user_agent, device
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                          ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
            )?;
            for t in batch {
                stmt.execute(params![
                    t.transaction_id,
                    t.user_id,
                    t.operation_type.as_str(),
                    t.crypto.as_str(),
                    t.target_crypto.map(|c| c.as_str()),
                    t.crypto_amount,
                    t.unit_price_usd,
                    t.amount_usd,
                    t.fee_usd,
                    t.total_usd,
                    t.started_at.format(TIMESTAMP_FMT).to_string(),
                    t.completed_at.format(TIMESTAMP_FMT).to_string(),
                    t.processing_seconds,
                    t.status.as_str(),
                    t.failure_reason,
                    t.requires_manual_validation,
                    t.payment_method.as_str(),
                    t.network.as_str(),
                    t.blockchain_hash,
                    t.blockchain_confirmations,
                    t.fraud_score,
                    t.fraud_flagged,
                    t.ip_address,
                    t.user_agent,
                    t.device.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_hourly_metrics(&self, metrics: &[HourlyMetric]) -> OpsResult<usize> {
        let result = (|| -> OpsResult<usize> {
            let tx = self.conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO hourly_metrics (
                        metric_date, hour, txn_count, success_count, failed_count, active_users,
                        mean_processing_seconds, median_processing_seconds,
                        p95_processing_seconds, max_processing_seconds, error_rate_pct,
                        manual_validation_rate_pct, fraud_rate_pct, total_volume_usd,
                        mean_volume_usd, total_fees_usd, buy_count, sell_count, swap_count,
                        withdrawal_count
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                              ?15, ?16, ?17, ?18, ?19, ?20)",
                )?;
                for m in metrics {
                    stmt.execute(params![
                        m.date.format(DATE_FMT).to_string(),
                        m.hour,
                        m.txn_count,
                        m.success_count,
                        m.failed_count,
                        m.active_users,
                        m.mean_processing_seconds,
                        m.median_processing_seconds,
                        m.p95_processing_seconds,
                        m.max_processing_seconds,
                        m.error_rate_pct,
                        m.manual_validation_rate_pct,
                        m.fraud_rate_pct,
                        m.total_volume_usd,
                        m.mean_volume_usd,
                        m.total_fees_usd,
                        m.buy_count,
                        m.sell_count,
                        m.swap_count,
                        m.withdrawal_count,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(metrics.len())
        })();
        if let Err(e) = &result {
            log::error!("hourly metric load rolled back: {e}");
        }
        result
    }

    // ── Loaders ───────────────────────────────────────────────────

    /// Every transaction started on or after `since`, ordered by id.
    pub fn analysis_rows(&self, since: NaiveDate) -> OpsResult<Vec<AnalysisRow>> {
        let sql = format!(
            "SELECT {ANALYSIS_COLUMNS}
             FROM transactions t
             JOIN users u ON t.user_id = u.user_id
             WHERE t.started_at >= ?1
             ORDER BY t.transaction_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let since = since.format(DATE_FMT).to_string();
        let rows = stmt.query_map(params![since], analysis_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Up to `limit` settled (success/failed) transactions started on or
    /// after `since`, lowest ids first.
    pub fn optimization_sample(&self, since: NaiveDate, limit: usize) -> OpsResult<Vec<AnalysisRow>> {
        let sql = format!(
            "SELECT {ANALYSIS_COLUMNS}
             FROM transactions t
             JOIN users u ON t.user_id = u.user_id
             WHERE t.status IN ('success', 'failed') AND t.started_at >= ?1
             ORDER BY t.transaction_id ASC
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let since = since.format(DATE_FMT).to_string();
        let rows = stmt.query_map(params![since, limit as i64], analysis_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Stored hourly metrics ordered by (date, hour).
    pub fn hourly_metrics(&self) -> OpsResult<Vec<HourlyMetric>> {
        let mut stmt = self.conn.prepare(
            "SELECT metric_date, hour, txn_count, success_count, failed_count, active_users,
                    mean_processing_seconds, median_processing_seconds, p95_processing_seconds,
                    max_processing_seconds, error_rate_pct, manual_validation_rate_pct,
                    fraud_rate_pct, total_volume_usd, mean_volume_usd, total_fees_usd,
                    buy_count, sell_count, swap_count, withdrawal_count
             FROM hourly_metrics
             ORDER BY metric_date ASC, hour ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let raw_date: String = row.get(0)?;
            let date = NaiveDate::parse_from_str(&raw_date, DATE_FMT).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            })?;
            Ok(HourlyMetric {
                date,
                hour: row.get(1)?,
                txn_count: row.get(2)?,
                success_count: row.get(3)?,
                failed_count: row.get(4)?,
                active_users: row.get(5)?,
                mean_processing_seconds: row.get(6)?,
                median_processing_seconds: row.get(7)?,
                p95_processing_seconds: row.get(8)?,
                max_processing_seconds: row.get(9)?,
                error_rate_pct: row.get(10)?,
                manual_validation_rate_pct: row.get(11)?,
                fraud_rate_pct: row.get(12)?,
                total_volume_usd: row.get(13)?,
                mean_volume_usd: row.get(14)?,
                total_fees_usd: row.get(15)?,
                buy_count: row.get(16)?,
                sell_count: row.get(17)?,
                swap_count: row.get(18)?,
                withdrawal_count: row.get(19)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// `(total_transactions, total_volume_usd)` maintained by the stats trigger.
    pub fn user_stats(&self, user_id: i64) -> OpsResult<(i64, f64)> {
        let stats = self.conn.query_row(
            "SELECT total_transactions, total_volume_usd FROM users WHERE user_id = ?1",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(stats)
    }
}

fn analysis_row(row: &Row<'_>) -> rusqlite::Result<AnalysisRow> {
    Ok(AnalysisRow {
        transaction_id: row.get(0)?,
        user_id: row.get(1)?,
        operation_type: parse_text(row, 2)?,
        crypto: parse_text(row, 3)?,
        amount_usd: row.get(4)?,
        fee_usd: row.get(5)?,
        started_at: parse_timestamp(row, 6)?,
        processing_seconds: row.get::<_, Option<i64>>(7)?.unwrap_or_default(),
        status: parse_text(row, 8)?,
        failure_reason: row.get(9)?,
        requires_manual_validation: row.get::<_, i32>(10)? != 0,
        payment_method: parse_text(row, 11)?,
        fraud_score: row.get::<_, Option<f64>>(12)?.unwrap_or_default(),
        verification_level: parse_text(row, 13)?,
    })
}
