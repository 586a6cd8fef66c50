//! Per-record processing of deaggregated batches
//!
//! [`DeaggregatingProcessor`] sits between a record source and user code: it
//! unpacks each batch against the hash key range of the shard being consumed
//! and hands the resulting logical records to a [`LogicalRecordProcessor`]
//! one at a time, in order.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_kinesis::types::{Record, Shard};
use tracing::{debug, error, instrument, trace, warn};

use crate::deaggregator::{Deaggregator, DeaggregatorConfig};
use crate::error::{ProcessingError, ProcessorError, Result};
use crate::hash_key::HashKeyRange;
use crate::monitoring::DeaggregationMetrics;
use crate::record::{LogicalRecord, RawRecord};

/// Trait for implementing logical record processing logic
///
/// # Examples
///
/// ```rust
/// use kpl_deaggregate::{LogicalRecord, LogicalRecordProcessor};
/// use kpl_deaggregate::error::ProcessingError;
///
/// #[derive(Clone)]
/// struct MyProcessor;
///
/// #[async_trait::async_trait]
/// impl LogicalRecordProcessor for MyProcessor {
///     async fn process_record(&self, record: &LogicalRecord) -> Result<(), ProcessingError> {
///         if record.data.is_empty() {
///             return Err(ProcessingError::hard(anyhow::anyhow!("empty record")));
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait LogicalRecordProcessor: Send + Sync + Clone {
    /// Process a single logical record
    ///
    /// # Returns
    ///
    /// * `Ok(())` if processing succeeded
    /// * `Err(ProcessingError::SoftFailure)` to mark the record failed and continue
    /// * `Err(ProcessingError::HardFailure)` to abort the batch
    async fn process_record(&self, record: &LogicalRecord) -> std::result::Result<(), ProcessingError>;
}

/// Identifies one logical record within a stream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub sequence_number: String,
    pub sub_sequence_number: u64,
}

impl From<&LogicalRecord> for RecordId {
    fn from(record: &LogicalRecord) -> Self {
        Self {
            sequence_number: record.sequence_number.clone(),
            sub_sequence_number: record.sub_sequence_number,
        }
    }
}

/// Result of processing a batch of records
#[derive(Debug, Default)]
pub struct BatchProcessingResult {
    /// Logical records processed successfully
    pub successful_records: Vec<RecordId>,
    /// Logical records that reported a soft failure
    pub failed_records: Vec<RecordId>,
    /// Last successfully processed logical record
    pub last_successful: Option<RecordId>,
    /// Deaggregation counters for the batch
    pub metrics: DeaggregationMetrics,
}

/// Deaggregates batches and feeds the logical records to a processor
#[derive(Clone)]
pub struct DeaggregatingProcessor<P>
where
    P: LogicalRecordProcessor + 'static,
{
    processor: Arc<P>,
    deaggregator: Deaggregator,
    range: HashKeyRange,
}

impl<P> DeaggregatingProcessor<P>
where
    P: LogicalRecordProcessor + 'static,
{
    pub fn new(processor: P, range: HashKeyRange, config: DeaggregatorConfig) -> Self {
        Self {
            processor: Arc::new(processor),
            deaggregator: Deaggregator::new(config),
            range,
        }
    }

    /// Create a processor that keeps only the keys `shard` owns.
    pub fn for_shard(processor: P, shard: &Shard, config: DeaggregatorConfig) -> Result<Self> {
        let range = HashKeyRange::from_shard(shard)?;
        debug!(
            shard_id = %shard.shard_id(),
            range_start = %range.start(),
            range_end = %range.end(),
            "Created deaggregating processor for shard"
        );
        Ok(Self::new(processor, range, config))
    }

    pub fn range(&self) -> HashKeyRange {
        self.range
    }

    /// Process a batch returned by `GetRecords`
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn process_batch(&self, records: &[Record]) -> Result<BatchProcessingResult> {
        let batch = self.deaggregator.deaggregate_kinesis(records, self.range)?;
        self.process_logical(batch.records, batch.metrics).await
    }

    /// Process a batch of already converted raw records
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn process_raw_batch(&self, records: &[RawRecord]) -> Result<BatchProcessingResult> {
        let batch = self.deaggregator.deaggregate_with_metrics(records, self.range);
        self.process_logical(batch.records, batch.metrics).await
    }

    async fn process_logical(
        &self,
        records: Vec<LogicalRecord>,
        metrics: DeaggregationMetrics,
    ) -> Result<BatchProcessingResult> {
        let mut result = BatchProcessingResult {
            metrics,
            ..Default::default()
        };

        for record in &records {
            let id = RecordId::from(record);

            match self.processor.process_record(record).await {
                Ok(()) => {
                    trace!(
                        sequence = %id.sequence_number,
                        sub_sequence = id.sub_sequence_number,
                        "Record processed"
                    );
                    result.successful_records.push(id.clone());
                    result.last_successful = Some(id);
                }
                Err(ProcessingError::SoftFailure(e)) => {
                    warn!(
                        sequence = %id.sequence_number,
                        sub_sequence = id.sub_sequence_number,
                        error = %e,
                        "Record processing failed"
                    );
                    result.failed_records.push(id);
                }
                Err(ProcessingError::HardFailure(e)) => {
                    error!(
                        sequence = %id.sequence_number,
                        sub_sequence = id.sub_sequence_number,
                        error = %e,
                        "Record processing failed permanently, aborting batch"
                    );
                    return Err(ProcessorError::HardFailure {
                        sequence_number: id.sequence_number,
                        sub_sequence_number: id.sub_sequence_number,
                        source: e,
                    });
                }
            }
        }

        debug!(
            successful = result.successful_records.len(),
            failed = result.failed_records.len(),
            "Batch processing completed"
        );

        Ok(result)
    }
}
