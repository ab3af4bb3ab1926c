use crate::{
    config::ValidatorRules,
    report::ReportTable,
    store::AnalysisRow,
    types::TxnId,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Approved,
    ManualReview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub transaction_id: TxnId,
    pub outcome: ValidationOutcome,
    pub reason: String,
    pub seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ValidatorStats {
    pub processed: u64,
    pub auto_approved: u64,
    pub manual_review: u64,
    /// No current rule rejects outright; kept for reporting.
    pub auto_rejected: u64,
    pub seconds_saved: i64,
}

impl ValidatorStats {
    /// Share of processed transactions approved automatically, in [0, 1].
    pub fn automation_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.auto_approved as f64 / self.processed as f64
        }
    }
}

/// Rule-based approval of low-risk transactions.
///
/// Rules run in order and the first failing rule sends the transaction to
/// manual review.
pub struct AutoValidator {
    rules: ValidatorRules,
    stats: ValidatorStats,
}

impl AutoValidator {
    pub fn new(rules: ValidatorRules) -> Self {
        Self {
            rules,
            stats: ValidatorStats::default(),
        }
    }

    pub fn stats(&self) -> ValidatorStats {
        self.stats
    }

    pub fn rules(&self) -> &ValidatorRules {
        &self.rules
    }

    pub fn validate(&mut self, row: &AnalysisRow) -> Decision {
        self.stats.processed += 1;
        match self.failing_rule(row) {
            Some(reason) => {
                self.stats.manual_review += 1;
                Decision {
                    transaction_id: row.transaction_id,
                    outcome: ValidationOutcome::ManualReview,
                    reason,
                    seconds: self.rules.manual_validation_seconds,
                }
            }
            None => {
                self.stats.auto_approved += 1;
                self.stats.seconds_saved +=
                    self.rules.manual_validation_seconds - self.rules.auto_validation_seconds;
                Decision {
                    transaction_id: row.transaction_id,
                    outcome: ValidationOutcome::Approved,
                    reason: "Automatic validation passed".into(),
                    seconds: self.rules.auto_validation_seconds,
                }
            }
        }
    }

    fn failing_rule(&self, row: &AnalysisRow) -> Option<String> {
        if row.verification_level < self.rules.min_verification_level {
            return Some(format!(
                "Insufficient verification level ({})",
                row.verification_level
            ));
        }
        if row.amount_usd > self.rules.max_auto_amount_usd {
            return Some(format!(
                "Amount exceeds automatic limit (${:.2})",
                row.amount_usd
            ));
        }
        if row.fraud_score > self.rules.max_fraud_score {
            return Some(format!("High fraud score ({:.1})", row.fraud_score));
        }
        if !self.rules.allowed_payment_methods.contains(&row.payment_method) {
            return Some(format!(
                "Payment method requires review: {}",
                row.payment_method
            ));
        }
        None
    }

    pub fn process_batch<'a>(&mut self, rows: impl IntoIterator<Item = &'a AnalysisRow>) -> Vec<Decision> {
        rows.into_iter().map(|r| self.validate(r)).collect()
    }

    pub fn stats_table(&self) -> ReportTable {
        let s = &self.stats;
        let share = |n: u64| {
            if s.processed == 0 {
                "0%".to_string()
            } else {
                format!("{:.1}%", n as f64 * 100.0 / s.processed as f64)
            }
        };
        let mut table = ReportTable::new("Automatic Validation", ["metric", "count", "share"]);
        table.push([
            "Transactions processed".to_string(),
            s.processed.to_string(),
            "100.0%".to_string(),
        ]);
        table.push([
            "Approved automatically".to_string(),
            s.auto_approved.to_string(),
            share(s.auto_approved),
        ]);
        table.push([
            "Require manual review".to_string(),
            s.manual_review.to_string(),
            share(s.manual_review),
        ]);
        table
    }
}
