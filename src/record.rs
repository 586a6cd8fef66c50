//! Raw transport records and the logical records produced from them

use aws_sdk_kinesis::types::Record;
use aws_smithy_types::Blob;
use aws_smithy_types_convert::date_time::DateTimeExt;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::RecordConversionError;

/// A record as delivered by the stream, possibly a KPL container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub partition_key: String,
    pub explicit_hash_key: Option<String>,
    pub data: Bytes,
    pub sequence_number: String,
    pub approximate_arrival_timestamp: Option<DateTime<Utc>>,
}

impl RawRecord {
    pub fn new(
        sequence_number: impl Into<String>,
        partition_key: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            explicit_hash_key: None,
            data: data.into(),
            sequence_number: sequence_number.into(),
            approximate_arrival_timestamp: None,
        }
    }

    pub fn with_explicit_hash_key(mut self, explicit_hash_key: impl Into<String>) -> Self {
        self.explicit_hash_key = Some(explicit_hash_key.into());
        self
    }

    pub fn with_arrival_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.approximate_arrival_timestamp = Some(timestamp);
        self
    }

    /// Convert a record returned by `GetRecords`.
    ///
    /// Kinesis does not return the explicit hash key a producer used, so the
    /// result never carries one.
    pub fn from_kinesis(record: &Record) -> Result<Self, RecordConversionError> {
        let approximate_arrival_timestamp = record
            .approximate_arrival_timestamp()
            .map(|ts| {
                ts.to_chrono_utc()
                    .map_err(|e| RecordConversionError::InvalidTimestamp(e.to_string()))
            })
            .transpose()?;

        Ok(Self {
            partition_key: record.partition_key().to_string(),
            explicit_hash_key: None,
            data: Bytes::copy_from_slice(record.data().as_ref()),
            sequence_number: record.sequence_number().to_string(),
            approximate_arrival_timestamp,
        })
    }
}

/// A single user record, either passed through or unpacked from a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalRecord {
    pub partition_key: String,
    pub explicit_hash_key: Option<String>,
    pub data: Bytes,
    pub sequence_number: String,
    pub approximate_arrival_timestamp: Option<DateTime<Utc>>,
    pub sub_sequence_number: u64,
    pub aggregated: bool,
}

impl LogicalRecord {
    /// Wrap a record that carried no KPL envelope.
    pub(crate) fn single(raw: &RawRecord) -> Self {
        Self {
            partition_key: raw.partition_key.clone(),
            explicit_hash_key: raw.explicit_hash_key.clone(),
            data: Bytes::copy_from_slice(&raw.data),
            sequence_number: raw.sequence_number.clone(),
            approximate_arrival_timestamp: raw.approximate_arrival_timestamp,
            sub_sequence_number: 0,
            aggregated: false,
        }
    }

    /// Build a record unpacked from `parent`.
    pub(crate) fn unpacked(
        parent: &RawRecord,
        partition_key: String,
        explicit_hash_key: Option<String>,
        data: Bytes,
        sub_sequence_number: u64,
    ) -> Self {
        Self {
            partition_key,
            explicit_hash_key,
            data,
            sequence_number: parent.sequence_number.clone(),
            approximate_arrival_timestamp: parent.approximate_arrival_timestamp,
            sub_sequence_number,
            aggregated: true,
        }
    }

    /// Build an SDK record for code that consumes `aws_sdk_kinesis` types.
    ///
    /// The SDK record has no slot for the sub-sequence number or explicit hash
    /// key; both are dropped.
    pub fn to_kinesis(&self) -> Result<Record, RecordConversionError> {
        let mut builder = Record::builder()
            .sequence_number(&self.sequence_number)
            .partition_key(&self.partition_key)
            .data(Blob::new(self.data.to_vec()));

        if let Some(ts) = self.approximate_arrival_timestamp {
            builder = builder
                .approximate_arrival_timestamp(aws_smithy_types::DateTime::from_chrono_utc(ts));
        }

        builder
            .build()
            .map_err(|e| RecordConversionError::Build(e.to_string()))
    }
}
