use crate::{store::AnalysisRow, types::{TxnId, VerificationLevel}};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    /// Mean handling time per transaction in this queue.
    pub fn service_seconds(&self) -> i64 {
        match self {
            Self::High => 30,
            Self::Normal => 45,
            Self::Low => 60,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high_priority",
            Self::Normal => "normal",
            Self::Low => "low_priority",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub high: usize,
    pub normal: usize,
    pub low: usize,
    pub estimated_seconds: i64,
}

/// Three-queue prioritization of peak-hour traffic.
#[derive(Debug, Default)]
pub struct PeakPrioritizer {
    high: Vec<TxnId>,
    normal: Vec<TxnId>,
    low: Vec<TxnId>,
}

impl PeakPrioritizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(row: &AnalysisRow) -> Priority {
        if row.amount_usd > 5_000.0 || row.verification_level == VerificationLevel::Full {
            Priority::High
        } else if row.amount_usd < 100.0 && row.verification_level == VerificationLevel::Basic {
            Priority::Low
        } else {
            Priority::Normal
        }
    }

    pub fn queue(&self, priority: Priority) -> &[TxnId] {
        match priority {
            Priority::High => &self.high,
            Priority::Normal => &self.normal,
            Priority::Low => &self.low,
        }
    }

    pub fn process<'a>(&mut self, rows: impl IntoIterator<Item = &'a AnalysisRow>) -> QueueSummary {
        for row in rows {
            let queue = match Self::assign(row) {
                Priority::High => &mut self.high,
                Priority::Normal => &mut self.normal,
                Priority::Low => &mut self.low,
            };
            queue.push(row.transaction_id);
        }
        let estimated_seconds = Priority::ALL
            .iter()
            .map(|p| self.queue(*p).len() as i64 * p.service_seconds())
            .sum();
        log::info!(
            "queues: {} high, {} normal, {} low; estimated {:.1} minutes",
            self.high.len(),
            self.normal.len(),
            self.low.len(),
            estimated_seconds as f64 / 60.0
        );
        QueueSummary {
            high: self.high.len(),
            normal: self.normal.len(),
            low: self.low.len(),
            estimated_seconds,
        }
    }
}
