//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Stages call store methods; they never execute SQL directly.

use crate::{
    error::{OpsError, OpsResult},
    report::ReportTable,
    types::{
        Crypto, OperationType, PaymentMethod, Period, TxnId, TxnStatus, UserId,
        VerificationLevel, TIMESTAMP_FMT,
    },
};
use chrono::{NaiveDateTime, Timelike};
use rusqlite::{types::ValueRef, Connection, OpenFlags, Row};
use std::path::Path;

mod catalog;
mod dataset;
mod reports;

pub use catalog::{ForeignKey, SmokeTestOutcome};
pub use reports::HourProcessingTimes;

pub struct OpsStore {
    conn: Connection,
}

/// One transaction joined with its owner's verification level.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRow {
    pub transaction_id: TxnId,
    pub user_id: UserId,
    pub operation_type: OperationType,
    pub crypto: Crypto,
    pub amount_usd: f64,
    pub fee_usd: f64,
    pub started_at: NaiveDateTime,
    pub processing_seconds: i64,
    pub status: TxnStatus,
    pub failure_reason: Option<String>,
    pub requires_manual_validation: bool,
    pub payment_method: PaymentMethod,
    pub fraud_score: f64,
    pub verification_level: VerificationLevel,
}

impl AnalysisRow {
    pub fn hour(&self) -> u32 {
        self.started_at.hour()
    }

    pub fn period(&self) -> Period {
        Period::from_hour(self.hour())
    }

    /// Success or failed (pending/processing rows are excluded from timing stats).
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_failed(&self) -> bool {
        self.status == TxnStatus::Failed
    }
}

impl OpsStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> OpsResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        log::debug!("opened database {path}");
        Ok(Self { conn })
    }

    /// Open a database file that must already exist. Nothing is created
    /// and no schema is applied, so the catalog is read as found.
    pub fn open_existing(path: &str) -> OpsResult<Self> {
        if !Path::new(path).is_file() {
            return Err(OpsError::DatabaseNotFound { path: path.to_string() });
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        log::debug!("opened existing database {path}");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> OpsResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply the schema. Safe to call on an already migrated database.
    pub fn migrate(&self) -> OpsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_schema.sql"))?;
        Ok(())
    }

    // ── System log ─────────────────────────────────────────────────

    pub fn append_log(&self, level: &str, component: &str, message: &str) -> OpsResult<()> {
        self.conn.execute(
            "INSERT INTO system_logs (level, component, message) VALUES (?1, ?2, ?3)",
            rusqlite::params![level, component, message],
        )?;
        Ok(())
    }

    /// `(level, component, message)` of every log row, oldest first.
    pub fn log_entries(&self) -> OpsResult<Vec<(String, String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT level, component, message FROM system_logs ORDER BY log_id ASC")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn config_value(&self, key: &str) -> OpsResult<Option<String>> {
        use rusqlite::OptionalExtension;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM system_config WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    // ── Ad-hoc reads ───────────────────────────────────────────────

    /// Run a read-only query and stringify every cell. Reals render with at
    /// most two decimals.
    pub fn query_table(&self, title: &str, sql: &str) -> OpsResult<ReportTable> {
        self.query_table_with(title, sql, [])
    }

    pub fn query_table_with<P: rusqlite::Params>(
        &self,
        title: &str,
        sql: &str,
        params: P,
    ) -> OpsResult<ReportTable> {
        let mut stmt = self.conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(OpsError::InvalidConfig(format!(
                "query for '{title}' is not read-only"
            )));
        }
        let headers: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = headers.len();
        let mut table = ReportTable::new(title, headers);
        let mut rows = stmt.query(params)?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(cell_text(row.get_ref(i)?));
            }
            table.push(cells);
        }
        Ok(table)
    }

    pub fn count_rows(&self, table: &str) -> OpsResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', ""));
        let n = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n)
    }
}

fn cell_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{f:.1}")
            } else {
                format!("{}", (f * 100.0).round() / 100.0)
            }
        }
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

// ── Column decoding ────────────────────────────────────────────────

fn parse_text<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = OpsError>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
