use super::OpsStore;
use crate::error::OpsResult;
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeSet;

/// `table.column → referenced_table`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub references: String,
}

impl ForeignKey {
    pub fn new(table: &str, column: &str, references: &str) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            references: references.into(),
        }
    }
}

/// What the insertion smoke test observed before rolling back.
#[derive(Debug, Clone, PartialEq)]
pub struct SmokeTestOutcome {
    pub filled_processing_seconds: Option<i64>,
    pub owner_transactions: i64,
    pub rows_left_behind: i64,
}

impl OpsStore {
    // ── Catalog ───────────────────────────────────────────────────

    fn master_names(&self, kind: &str) -> OpsResult<BTreeSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%'",
        )?;
        let rows = stmt.query_map([kind], |row| row.get(0))?;
        rows.collect::<Result<BTreeSet<_>, _>>().map_err(Into::into)
    }

    pub fn table_names(&self) -> OpsResult<BTreeSet<String>> {
        self.master_names("table")
    }

    pub fn view_names(&self) -> OpsResult<BTreeSet<String>> {
        self.master_names("view")
    }

    pub fn trigger_names(&self) -> OpsResult<BTreeSet<String>> {
        self.master_names("trigger")
    }

    /// Named (non-automatic) indexes of `table`.
    pub fn index_names(&self, table: &str) -> OpsResult<BTreeSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM pragma_index_list(?1) WHERE origin = 'c'",
        )?;
        let rows = stmt.query_map([table], |row| row.get(0))?;
        rows.collect::<Result<BTreeSet<_>, _>>().map_err(Into::into)
    }

    /// Foreign keys declared by every table.
    pub fn foreign_keys(&self) -> OpsResult<BTreeSet<ForeignKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.name, f.\"from\", f.\"table\"
             FROM sqlite_master m
             JOIN pragma_foreign_key_list(m.name) f
             WHERE m.type = 'table'",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ForeignKey {
                table: row.get(0)?,
                column: row.get(1)?,
                references: row.get(2)?,
            })
        })?;
        rows.collect::<Result<BTreeSet<_>, _>>().map_err(Into::into)
    }

    /// Insert a user and a transaction with no processing time inside a
    /// savepoint, observe the triggers, then roll everything back.
    pub fn insertion_smoke_test(&self) -> OpsResult<SmokeTestOutcome> {
        self.conn.execute_batch("SAVEPOINT schema_smoke;")?;
        let observed = self.smoke_inserts();
        let rollback = self
            .conn
            .execute_batch("ROLLBACK TO schema_smoke; RELEASE schema_smoke;");
        let (filled, owner_transactions) = observed?;
        rollback?;

        let rows_left_behind = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = 'schema_smoke_user'",
            [],
            |row| row.get(0),
        )?;
        Ok(SmokeTestOutcome {
            filled_processing_seconds: filled,
            owner_transactions,
            rows_left_behind,
        })
    }

    fn smoke_inserts(&self) -> OpsResult<(Option<i64>, i64)> {
        self.conn.execute(
            "INSERT INTO users (username, email, country, verification_level)
             VALUES ('schema_smoke_user', 'schema_smoke@example.test', 'Argentina', 'basic')",
            [],
        )?;
        let user_id = self.conn.last_insert_rowid();
        self.conn.execute(
            "INSERT INTO transactions (
                user_id, operation_type, crypto, crypto_amount, unit_price_usd,
                amount_usd, total_usd, started_at, completed_at, payment_method, status
             ) VALUES (?1, 'buy', 'BTC', 0.1, 50000, 5000, 5000,
                       '2024-07-01 10:00:00', '2024-07-01 10:01:30', 'card', 'success')",
            params![user_id],
        )?;
        let txn_id = self.conn.last_insert_rowid();
        let filled: Option<i64> = self
            .conn
            .query_row(
                "SELECT processing_seconds FROM transactions WHERE transaction_id = ?1",
                [txn_id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();
        let owner_transactions = self.conn.query_row(
            "SELECT total_transactions FROM users WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok((filled, owner_transactions))
    }
}
