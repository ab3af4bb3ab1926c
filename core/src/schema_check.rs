//! Schema verification against the objects the migration must create.

use crate::{
    error::OpsResult,
    report::ReportTable,
    store::{ForeignKey, OpsStore},
};
use std::collections::BTreeSet;

pub const EXPECTED_TABLES: [&str; 6] = [
    "users",
    "transactions",
    "hourly_metrics",
    "validations",
    "system_logs",
    "system_config",
];

pub const EXPECTED_VIEWS: [&str; 3] = ["v_realtime_metrics", "v_top_cryptos", "v_user_summary"];

pub const EXPECTED_TRIGGERS: [&str; 2] = ["trg_fill_processing_time", "trg_update_user_stats"];

pub const EXPECTED_INDEXES: [(&str, &[&str]); 2] = [
    (
        "users",
        &[
            "idx_users_country",
            "idx_users_verification_level",
            "idx_users_account_status",
            "idx_users_registered_at",
        ],
    ),
    (
        "transactions",
        &[
            "idx_transactions_user_id",
            "idx_transactions_started_at",
            "idx_transactions_status",
            "idx_transactions_operation_type",
            "idx_transactions_crypto",
            "idx_transactions_payment_method",
        ],
    ),
];

pub const EXPECTED_FOREIGN_KEYS: [(&str, &str, &str); 4] = [
    ("transactions", "user_id", "users"),
    ("validations", "transaction_id", "transactions"),
    ("system_logs", "transaction_id", "transactions"),
    ("system_logs", "user_id", "users"),
];

/// Processing time the smoke-test transaction must receive from the trigger.
const SMOKE_EXPECTED_SECONDS: i64 = 90;

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaCheck {
    pub name: &'static str,
    pub passed: bool,
    /// Missing objects, or the failure observed.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaReport {
    pub checks: Vec<SchemaCheck>,
}

impl SchemaReport {
    pub fn is_valid(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn verdict(&self) -> &'static str {
        if self.is_valid() {
            "SCHEMA VALID"
        } else {
            "SCHEMA INCOMPLETE"
        }
    }

    pub fn check(&self, name: &str) -> Option<&SchemaCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn table(&self) -> ReportTable {
        let mut table = ReportTable::new("Schema Verification", ["check", "passed", "missing"]);
        for c in &self.checks {
            table.push([
                c.name.to_string(),
                if c.passed { "yes" } else { "no" }.to_string(),
                c.missing.join(", "),
            ]);
        }
        table
    }
}

fn presence(name: &'static str, expected: &[&str], actual: &BTreeSet<String>) -> SchemaCheck {
    let missing: Vec<String> = expected
        .iter()
        .filter(|e| !actual.contains(**e))
        .map(|e| e.to_string())
        .collect();
    SchemaCheck {
        name,
        passed: missing.is_empty(),
        missing,
    }
}

/// Run every catalog check plus the insertion smoke test.
pub fn verify_schema(store: &OpsStore) -> OpsResult<SchemaReport> {
    let mut checks = vec![
        presence("Tables", &EXPECTED_TABLES, &store.table_names()?),
        presence("Views", &EXPECTED_VIEWS, &store.view_names()?),
        presence("Triggers", &EXPECTED_TRIGGERS, &store.trigger_names()?),
    ];

    let mut missing_indexes = Vec::new();
    for (table, expected) in EXPECTED_INDEXES {
        let actual = store.index_names(table)?;
        missing_indexes.extend(presence("Indexes", expected, &actual).missing);
    }
    checks.push(SchemaCheck {
        name: "Indexes",
        passed: missing_indexes.is_empty(),
        missing: missing_indexes,
    });

    let actual_fks = store.foreign_keys()?;
    let missing_fks: Vec<String> = EXPECTED_FOREIGN_KEYS
        .iter()
        .map(|(t, c, r)| ForeignKey::new(t, c, r))
        .filter(|fk| !actual_fks.contains(fk))
        .map(|fk| format!("{}.{} -> {}", fk.table, fk.column, fk.references))
        .collect();
    checks.push(SchemaCheck {
        name: "Foreign Keys",
        passed: missing_fks.is_empty(),
        missing: missing_fks,
    });

    checks.push(insertion_check(store));

    let report = SchemaReport { checks };
    if report.is_valid() {
        log::info!("schema verification passed");
    } else {
        log::warn!("schema verification failed: {:?}", report.checks.iter().filter(|c| !c.passed).map(|c| c.name).collect::<Vec<_>>());
    }
    Ok(report)
}

/// A failing insert is a failed check, not an error.
fn insertion_check(store: &OpsStore) -> SchemaCheck {
    let mut problems = Vec::new();
    match store.insertion_smoke_test() {
        Ok(outcome) => {
            if outcome.filled_processing_seconds != Some(SMOKE_EXPECTED_SECONDS) {
                problems.push(format!(
                    "processing time filled as {:?}, expected {SMOKE_EXPECTED_SECONDS}",
                    outcome.filled_processing_seconds
                ));
            }
            if outcome.owner_transactions != 1 {
                problems.push(format!(
                    "owner transaction count {}, expected 1",
                    outcome.owner_transactions
                ));
            }
            if outcome.rows_left_behind != 0 {
                problems.push(format!("{} rows left after rollback", outcome.rows_left_behind));
            }
        }
        Err(e) => {
            log::error!("insertion smoke test failed: {e}");
            problems.push(e.to_string());
        }
    }
    SchemaCheck {
        name: "Inserts",
        passed: problems.is_empty(),
        missing: problems,
    }
}
