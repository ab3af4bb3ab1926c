//! cryptoops-core: synthetic crypto-exchange operations data, SQL
//! reporting, bottleneck analysis and optimization projections.

pub mod analysis;
pub mod charts;
pub mod config;
pub mod error;
pub mod export;
pub mod hourly_metrics;
pub mod name_generator;
pub mod optimizer;
pub mod pipeline;
pub mod report;
pub mod rng;
pub mod schema_check;
pub mod stage;
pub mod stages;
pub mod stats;
pub mod store;
pub mod transaction_generator;
pub mod types;
pub mod user_generator;
