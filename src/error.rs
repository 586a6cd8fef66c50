//! Error types for deaggregation and record processing

use thiserror::Error;

/// Failure to read the payload of a record that carried a valid KPL envelope.
///
/// These never escape [`crate::Deaggregator::deaggregate`]; they are logged and
/// counted, and the offending parent record produces no output.
#[derive(Debug, Error)]
pub enum DeaggregationError {
    #[error("Failed to decode aggregated payload: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Partition key index {index} out of range (table size {table_size})")]
    PartitionKeyIndexOutOfRange { index: u64, table_size: usize },

    #[error("Explicit hash key index {index} out of range (table size {table_size})")]
    ExplicitHashKeyIndexOutOfRange { index: u64, table_size: usize },

    #[error("Invalid explicit hash key: {0:?}")]
    InvalidExplicitHashKey(String),
}

/// Rejections of a caller supplied hash key range
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashKeyRangeError {
    #[error("Hash key range start {start} is greater than end {end}")]
    Inverted { start: u128, end: u128 },

    #[error("Invalid hash key bound: {0:?}")]
    InvalidBound(String),

    #[error("Shard {0} has no hash key range")]
    MissingRange(String),
}

/// Error converting between SDK and crate record types
#[derive(Debug, Error)]
pub enum RecordConversionError {
    #[error("Invalid arrival timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Failed to build record: {0}")]
    Build(String),
}

/// Main error type for processor operations
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Record {sequence_number}/{sub_sequence_number} failed permanently: {source}")]
    HardFailure {
        sequence_number: String,
        sub_sequence_number: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Conversion(#[from] RecordConversionError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] HashKeyRangeError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for processor operations
pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Failure reported by a [`crate::LogicalRecordProcessor`]
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Soft failure (retriable): {0}")]
    SoftFailure(#[source] anyhow::Error),

    #[error("Hard failure (non-retriable): {0}")]
    HardFailure(#[source] anyhow::Error),
}

impl ProcessingError {
    pub fn soft(err: impl Into<anyhow::Error>) -> Self {
        ProcessingError::SoftFailure(err.into())
    }

    pub fn hard(err: impl Into<anyhow::Error>) -> Self {
        ProcessingError::HardFailure(err.into())
    }
}
