//! Per-record outcomes and batch counters for deaggregation

mod metrics;
mod types;

pub use metrics::DeaggregationMetrics;
pub use types::RecordOutcome;
