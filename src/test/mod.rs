//! Test utilities for building raw, SDK and aggregated records


use aws_sdk_kinesis::types::{HashKeyRange as SdkHashKeyRange, Record, Shard};
use bytes::Bytes;
use prost::Message;

use crate::envelope::AGGREGATED_RECORD_MAGIC;
use crate::messages::{AggregatedRecord, SubRecord};
use crate::record::RawRecord;

/// Helper functions for creating test data
pub struct TestUtils;

impl TestUtils {
    /// Create an SDK record with given sequence number and data
    pub fn create_test_record(sequence_number: &str, data: &[u8]) -> Record {
        Record::builder()
            .sequence_number(sequence_number)
            .data(aws_smithy_types::Blob::new(data.to_vec()))
            .partition_key("test-partition-key")
            .build()
            .expect("Failed to build test record")
    }

    /// Create a vector of plain SDK records
    pub fn create_test_records(count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| {
                Self::create_test_record(
                    &format!("sequence-{}", i),
                    format!("data-{}", i).as_bytes(),
                )
            })
            .collect()
    }

    /// Create a shard without a hash key range
    pub fn create_test_shard(shard_id: &str) -> Shard {
        Shard::builder()
            .shard_id(shard_id)
            .build()
            .expect("Failed to build test shard")
    }

    /// Create a shard covering `[start, end]`
    pub fn create_test_shard_with_range(shard_id: &str, start: u128, end: u128) -> Shard {
        Shard::builder()
            .shard_id(shard_id)
            .hash_key_range(
                SdkHashKeyRange::builder()
                    .starting_hash_key(start.to_string())
                    .ending_hash_key(end.to_string())
                    .build()
                    .expect("Failed to build hash key range"),
            )
            .build()
            .expect("Failed to build test shard")
    }

    /// Frame an encoded payload with the magic prefix and MD5 trailer
    pub fn frame(body: &[u8]) -> Bytes {
        let mut data = Vec::with_capacity(AGGREGATED_RECORD_MAGIC.len() + body.len() + 16);
        data.extend_from_slice(&AGGREGATED_RECORD_MAGIC);
        data.extend_from_slice(body);
        data.extend_from_slice(&md5::compute(body).0);
        Bytes::from(data)
    }

    /// Encode and frame an aggregated payload
    pub fn encode_aggregated(payload: &AggregatedRecord) -> Bytes {
        Self::frame(&payload.encode_to_vec())
    }

    /// Build a payload from `(partition_key, explicit_hash_key, data)` triples,
    /// deduplicating keys into the tables the way the KPL does.
    pub fn aggregated_payload(entries: &[(&str, Option<&str>, &str)]) -> AggregatedRecord {
        let mut payload = AggregatedRecord::default();

        for (partition_key, explicit_hash_key, data) in entries {
            let partition_key_index = table_index(&mut payload.partition_key_table, partition_key);
            let explicit_hash_key_index = explicit_hash_key
                .map(|ehk| table_index(&mut payload.explicit_hash_key_table, ehk));

            payload.records.push(SubRecord {
                partition_key_index,
                explicit_hash_key_index,
                data: Bytes::copy_from_slice(data.as_bytes()),
                tags: vec![],
            });
        }

        payload
    }

    /// Build a framed aggregated raw record
    pub fn create_aggregated_record(
        sequence_number: &str,
        entries: &[(&str, Option<&str>, &str)],
    ) -> RawRecord {
        RawRecord::new(
            sequence_number,
            "aggregated-partition-key",
            Self::encode_aggregated(&Self::aggregated_payload(entries)),
        )
    }

    /// Build a framed aggregated SDK record
    pub fn create_aggregated_sdk_record(
        sequence_number: &str,
        entries: &[(&str, Option<&str>, &str)],
    ) -> Record {
        Self::create_test_record(
            sequence_number,
            &Self::encode_aggregated(&Self::aggregated_payload(entries)),
        )
    }

    /// Build a plain raw record
    pub fn create_raw_record(sequence_number: &str, partition_key: &str, data: &[u8]) -> RawRecord {
        RawRecord::new(sequence_number, partition_key, Bytes::copy_from_slice(data))
    }
}

fn table_index(table: &mut Vec<String>, key: &str) -> u64 {
    let index = match table.iter().position(|existing| existing == key) {
        Some(index) => index,
        None => {
            table.push(key.to_string());
            table.len() - 1
        }
    };
    index as u64
}

/// Initialize test logging once per process
#[cfg(test)]
pub(crate) fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("kpl_deaggregate=debug".parse().unwrap()),
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{inspect, Frame};

    #[test]
    fn test_create_test_record() {
        let record = TestUtils::create_test_record("seq-1", b"test-data");
        assert_eq!(record.sequence_number(), "seq-1");
        assert_eq!(record.data().as_ref(), b"test-data");
        assert_eq!(record.partition_key(), "test-partition-key");
    }

    #[test]
    fn test_aggregated_payload_deduplicates_keys() {
        let payload = TestUtils::aggregated_payload(&[
            ("A", None, "1"),
            ("B", Some("7"), "2"),
            ("A", Some("7"), "3"),
        ]);
        assert_eq!(payload.partition_key_table, vec!["A", "B"]);
        assert_eq!(payload.explicit_hash_key_table, vec!["7"]);
        assert_eq!(payload.records[2].partition_key_index, 0);
        assert_eq!(payload.records[2].explicit_hash_key_index, Some(0));
    }

    #[test]
    fn test_aggregated_record_is_detected() {
        let record = TestUtils::create_aggregated_record("seq-1", &[("A", None, "x")]);
        assert!(matches!(inspect(&record.data), Frame::Aggregated(_)));
    }
}
