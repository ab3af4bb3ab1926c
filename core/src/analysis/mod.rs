//! Read-only analyses over the loaded dataset.

pub mod bottlenecks;
pub mod sql_reports;
