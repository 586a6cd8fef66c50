use serde::Serialize;
use tracing::debug;

use super::types::RecordOutcome;

/// Counters for a single deaggregation call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeaggregationMetrics {
    // Input
    pub records_in: u64,
    pub passthrough: u64,
    pub aggregated_parents: u64,

    // Output
    pub records_out: u64,

    // Filtering and failures
    pub rolled_back_parents: u64,
    pub discarded_sub_records: u64,
    pub decode_failures: u64,
}

impl DeaggregationMetrics {
    pub fn record(&mut self, outcome: &RecordOutcome) {
        self.records_in += 1;
        self.records_out += outcome.emitted() as u64;

        match outcome {
            RecordOutcome::Passthrough { .. } => {
                self.passthrough += 1;
            }
            RecordOutcome::Expanded { .. } => {
                self.aggregated_parents += 1;
            }
            RecordOutcome::RolledBack { discarded, .. } => {
                self.aggregated_parents += 1;
                self.rolled_back_parents += 1;
                self.discarded_sub_records += *discarded as u64;
            }
            RecordOutcome::DecodeFailed { .. } => {
                self.aggregated_parents += 1;
                self.decode_failures += 1;
            }
        }
    }

    /// Fold another call's counters into this one.
    pub fn merge(&mut self, other: &DeaggregationMetrics) {
        self.records_in += other.records_in;
        self.passthrough += other.passthrough;
        self.aggregated_parents += other.aggregated_parents;
        self.records_out += other.records_out;
        self.rolled_back_parents += other.rolled_back_parents;
        self.discarded_sub_records += other.discarded_sub_records;
        self.decode_failures += other.decode_failures;
    }

    pub fn emit(&self) {
        debug!(
            records_in = self.records_in,
            records_out = self.records_out,
            passthrough = self.passthrough,
            aggregated = self.aggregated_parents,
            rolled_back = self.rolled_back_parents,
            discarded = self.discarded_sub_records,
            decode_failures = self.decode_failures,
            "Deaggregation metrics"
        );
    }
}
