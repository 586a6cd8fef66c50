//! Core deaggregation of KPL container records
//!
//! This module turns a batch of raw stream records into the logical user
//! records they carry. For each raw record it:
//!
//! - Detects the KPL envelope and verifies its MD5 trailer
//! - Decodes the embedded `AggregatedRecord` payload
//! - Filters sub-records against the consumer's hash key range
//! - Passes anything that is not a valid container through unchanged
//!
//! A container is all-or-nothing: if any sub-record is out of range, or the
//! payload cannot be read, none of its sub-records are emitted.

use aws_sdk_kinesis::types::Record;
use base64::prelude::*;
use prost::Message;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::envelope::{self, Frame};
use crate::error::{DeaggregationError, RecordConversionError};
use crate::hash_key::{effective_hash_key, HashKeyRange};
use crate::messages::AggregatedRecord;
use crate::monitoring::{DeaggregationMetrics, RecordOutcome};
use crate::record::{LogicalRecord, RawRecord};

/// How sub-sequence numbers are assigned to unpacked records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubSequenceNumbering {
    /// One counter for the whole batch; numbers never repeat within a call
    #[default]
    BatchWide,
    /// Counter restarts at 0 for every container
    PerParent,
}

/// Configuration for the deaggregator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeaggregatorConfig {
    /// Sub-sequence numbering policy
    pub sub_sequence_numbering: SubSequenceNumbering,
    /// Include the base64 payload of unreadable containers in warning logs
    pub log_payload_on_failure: bool,
}

/// Output of one deaggregation call
#[derive(Debug, Clone, Default)]
pub struct DeaggregationBatch {
    pub records: Vec<LogicalRecord>,
    pub metrics: DeaggregationMetrics,
}

/// How the expansion of one container ended
enum Expansion {
    Complete,
    OutOfRange { position: usize, hash_key: u128 },
}

/// Stateless KPL deaggregator
///
/// # Examples
///
/// ```rust
/// use bytes::Bytes;
/// use kpl_deaggregate::{Deaggregator, HashKeyRange, RawRecord};
///
/// let records = vec![RawRecord::new("seq-1", "pk", Bytes::from_static(b"plain"))];
/// let output = Deaggregator::default().deaggregate(&records, HashKeyRange::full());
///
/// assert_eq!(output.len(), 1);
/// assert!(!output[0].aggregated);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Deaggregator {
    config: DeaggregatorConfig,
}

impl Deaggregator {
    pub fn new(config: DeaggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DeaggregatorConfig {
        &self.config
    }

    /// Unpack a batch of raw records, keeping only keys inside `range`.
    pub fn deaggregate(&self, records: &[RawRecord], range: HashKeyRange) -> Vec<LogicalRecord> {
        self.deaggregate_with_metrics(records, range).records
    }

    /// Unpack a batch of records returned by `GetRecords`.
    pub fn deaggregate_kinesis(
        &self,
        records: &[Record],
        range: HashKeyRange,
    ) -> Result<DeaggregationBatch, RecordConversionError> {
        let raw = records
            .iter()
            .map(RawRecord::from_kinesis)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.deaggregate_with_metrics(&raw, range))
    }

    /// Unpack a batch and report what happened to each input record.
    pub fn deaggregate_with_metrics(
        &self,
        records: &[RawRecord],
        range: HashKeyRange,
    ) -> DeaggregationBatch {
        let mut batch = DeaggregationBatch {
            records: Vec::with_capacity(records.len()),
            metrics: DeaggregationMetrics::default(),
        };
        let mut sub_sequence = 0u64;

        for record in records {
            if self.config.sub_sequence_numbering == SubSequenceNumbering::PerParent {
                sub_sequence = 0;
            }

            let outcome =
                self.deaggregate_record(record, range, &mut sub_sequence, &mut batch.records);
            batch.metrics.record(&outcome);
        }

        batch.metrics.emit();
        batch
    }

    fn deaggregate_record(
        &self,
        record: &RawRecord,
        range: HashKeyRange,
        sub_sequence: &mut u64,
        output: &mut Vec<LogicalRecord>,
    ) -> RecordOutcome {
        let envelope = match envelope::inspect(&record.data) {
            Frame::Aggregated(envelope) => envelope,
            Frame::Single(reason) => {
                trace!(
                    sequence_number = %record.sequence_number,
                    reason = ?reason,
                    "Passing through non-aggregated record"
                );
                output.push(LogicalRecord::single(record));
                return RecordOutcome::Passthrough { reason };
            }
        };

        let payload = match AggregatedRecord::decode(envelope.message_body) {
            Ok(payload) => payload,
            Err(e) => {
                let error = DeaggregationError::from(e);
                self.report_decode_failure(record, envelope.message_body, None, &error);
                return RecordOutcome::DecodeFailed {
                    error: error.to_string(),
                };
            }
        };

        let parent_start = output.len();
        match expand(record, &payload, range, sub_sequence, output) {
            Ok(Expansion::Complete) => RecordOutcome::Expanded {
                emitted: output.len() - parent_start,
            },
            Ok(Expansion::OutOfRange { position, hash_key }) => {
                let discarded = output.len() - parent_start;
                output.truncate(parent_start);
                debug!(
                    sequence_number = %record.sequence_number,
                    position,
                    hash_key = %hash_key,
                    range_start = %range.start(),
                    range_end = %range.end(),
                    discarded,
                    "Sub-record outside hash key range, dropping aggregated record"
                );
                RecordOutcome::RolledBack {
                    discarded,
                    total: payload.records.len(),
                }
            }
            Err(error) => {
                output.truncate(parent_start);
                self.report_decode_failure(record, envelope.message_body, Some(&payload), &error);
                RecordOutcome::DecodeFailed {
                    error: error.to_string(),
                }
            }
        }
    }

    fn report_decode_failure(
        &self,
        record: &RawRecord,
        message_body: &[u8],
        payload: Option<&AggregatedRecord>,
        error: &DeaggregationError,
    ) {
        let raw_data = self
            .config
            .log_payload_on_failure
            .then(|| BASE64_STANDARD.encode(message_body));

        warn!(
            sequence_number = %record.sequence_number,
            error = %error,
            partition_keys = payload.map(|p| p.partition_key_table.len()),
            explicit_hash_keys = payload.map(|p| p.explicit_hash_key_table.len()),
            sub_records = payload.map(|p| p.records.len()),
            body_len = message_body.len(),
            raw_data = raw_data.as_deref().unwrap_or("<omitted>"),
            "Unreadable aggregated record, skipping"
        );
    }
}

/// Append the sub-records of one container to `output`.
///
/// Stops at the first sub-record outside `range`; the caller discards whatever
/// was appended for this container in that case.
fn expand(
    parent: &RawRecord,
    payload: &AggregatedRecord,
    range: HashKeyRange,
    sub_sequence: &mut u64,
    output: &mut Vec<LogicalRecord>,
) -> Result<Expansion, DeaggregationError> {
    for (position, sub_record) in payload.records.iter().enumerate() {
        let partition_key = lookup(&payload.partition_key_table, sub_record.partition_key_index)
            .ok_or(DeaggregationError::PartitionKeyIndexOutOfRange {
                index: sub_record.partition_key_index,
                table_size: payload.partition_key_table.len(),
            })?;

        let explicit_hash_key = sub_record
            .explicit_hash_key_index
            .map(|index| {
                lookup(&payload.explicit_hash_key_table, index).ok_or(
                    DeaggregationError::ExplicitHashKeyIndexOutOfRange {
                        index,
                        table_size: payload.explicit_hash_key_table.len(),
                    },
                )
            })
            .transpose()?;

        let hash_key = effective_hash_key(partition_key, explicit_hash_key)?;
        if !range.contains(hash_key) {
            return Ok(Expansion::OutOfRange { position, hash_key });
        }

        output.push(LogicalRecord::unpacked(
            parent,
            partition_key.to_string(),
            explicit_hash_key.map(str::to_string),
            sub_record.data.clone(),
            *sub_sequence,
        ));
        *sub_sequence += 1;
    }

    Ok(Expansion::Complete)
}

fn lookup(table: &[String], index: u64) -> Option<&str> {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i))
        .map(String::as_str)
}

/// Unpack `records` with the default configuration.
pub fn deaggregate(records: &[RawRecord], range: HashKeyRange) -> Vec<LogicalRecord> {
    Deaggregator::default().deaggregate(records, range)
}
