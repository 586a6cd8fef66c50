//! Hash key arithmetic and shard key-space ranges

use aws_sdk_kinesis::types::Shard;

use crate::error::{DeaggregationError, HashKeyRangeError};

/// Inclusive range of 128-bit hash keys owned by a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKeyRange {
    start: u128,
    end: u128,
}

impl HashKeyRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: u128, end: u128) -> Result<Self, HashKeyRangeError> {
        if start > end {
            return Err(HashKeyRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// The whole key space, for consumers that own every shard's keys.
    pub fn full() -> Self {
        Self {
            start: 0,
            end: u128::MAX,
        }
    }

    /// Build a range from the decimal strings Kinesis uses for shard bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self, HashKeyRangeError> {
        let start = parse_bound(start)?;
        let end = parse_bound(end)?;
        Self::new(start, end)
    }

    /// Build the range a shard covers from its `ListShards` description.
    pub fn from_shard(shard: &Shard) -> Result<Self, HashKeyRangeError> {
        let range = shard
            .hash_key_range()
            .ok_or_else(|| HashKeyRangeError::MissingRange(shard.shard_id().to_string()))?;
        Self::parse(range.starting_hash_key(), range.ending_hash_key())
    }

    pub fn start(&self) -> u128 {
        self.start
    }

    pub fn end(&self) -> u128 {
        self.end
    }

    pub fn contains(&self, hash_key: u128) -> bool {
        self.start <= hash_key && hash_key <= self.end
    }
}

impl Default for HashKeyRange {
    fn default() -> Self {
        Self::full()
    }
}

fn parse_bound(value: &str) -> Result<u128, HashKeyRangeError> {
    value
        .parse::<u128>()
        .map_err(|_| HashKeyRangeError::InvalidBound(value.to_string()))
}

/// MD5 of the partition key, read as a big-endian unsigned integer.
pub fn partition_key_hash(partition_key: &str) -> u128 {
    u128::from_be_bytes(md5::compute(partition_key.as_bytes()).0)
}

/// The key Kinesis routes a record by: the explicit hash key when one is set,
/// otherwise the partition key hash.
pub fn effective_hash_key(
    partition_key: &str,
    explicit_hash_key: Option<&str>,
) -> Result<u128, DeaggregationError> {
    match explicit_hash_key {
        Some(explicit) => explicit
            .parse::<u128>()
            .map_err(|_| DeaggregationError::InvalidExplicitHashKey(explicit.to_string())),
        None => Ok(partition_key_hash(partition_key)),
    }
}
