//! KPL Deaggregate - Unpack Kinesis Producer Library aggregated records
//!
//! This crate turns batches of raw Kinesis records into the logical user
//! records packed inside KPL aggregated containers, verifying each container's
//! MD5 trailer and keeping only the records whose hash key falls inside the
//! consumer's shard range.

pub mod deaggregator;
pub mod envelope;
pub mod error;
pub mod hash_key;
pub mod messages;
pub mod processor;
pub mod record;

// Make test utilities available for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test;
pub mod monitoring;

pub use deaggregator::{
    deaggregate, DeaggregationBatch, Deaggregator, DeaggregatorConfig, SubSequenceNumbering,
};
pub use error::{DeaggregationError, HashKeyRangeError, ProcessorError, Result};
pub use hash_key::HashKeyRange;
pub use record::{LogicalRecord, RawRecord};

// Re-export main traits
pub use crate::processor::{DeaggregatingProcessor, LogicalRecordProcessor};
