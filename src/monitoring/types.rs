use crate::envelope::NotAggregated;

/// What happened to one raw record during deaggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Not a KPL container; emitted unchanged
    Passthrough { reason: NotAggregated },
    /// Container unpacked; every sub-record was in range
    Expanded { emitted: usize },
    /// A sub-record fell outside the hash key range; the whole parent was dropped
    RolledBack {
        /// Sub-records produced before the out-of-range one and then discarded
        discarded: usize,
        /// Total sub-records in the container
        total: usize,
    },
    /// Valid envelope but unreadable payload; nothing emitted
    DecodeFailed { error: String },
}

impl RecordOutcome {
    /// Number of logical records this outcome contributed to the output
    pub fn emitted(&self) -> usize {
        match self {
            RecordOutcome::Passthrough { .. } => 1,
            RecordOutcome::Expanded { emitted } => *emitted,
            RecordOutcome::RolledBack { .. } | RecordOutcome::DecodeFailed { .. } => 0,
        }
    }

    pub fn is_aggregated(&self) -> bool {
        !matches!(self, RecordOutcome::Passthrough { .. })
    }
}
