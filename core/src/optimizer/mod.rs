//! Simulated process optimizations over historical transactions.
//!
//! Nothing here touches live traffic: every simulation replays rows
//! already loaded by the store.

pub mod auto_validator;
pub mod peak_prioritizer;
pub mod simulation;

pub use auto_validator::{AutoValidator, Decision, ValidationOutcome, ValidatorStats};
pub use peak_prioritizer::{PeakPrioritizer, Priority, QueueSummary};
pub use simulation::{implementation_proposals, simulate_optimizations, OptimizationResult};
