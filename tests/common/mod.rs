// tests/common/mod.rs
#![allow(dead_code)]

use kpl_deaggregate::hash_key::partition_key_hash;
use kpl_deaggregate::{HashKeyRange, LogicalRecord};
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("kpl_deaggregate=debug".parse().unwrap())
                    .add_directive("test=debug".parse().unwrap()),
            )
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .try_init()
            .ok();
    });
}

/// Range containing exactly the hash of `partition_key`
pub fn range_for_key(partition_key: &str) -> HashKeyRange {
    let hash = partition_key_hash(partition_key);
    HashKeyRange::new(hash, hash).expect("single-key range is valid")
}

/// Range that excludes `partition_key`'s hash and includes everything else on one side
pub fn range_excluding_key(partition_key: &str) -> HashKeyRange {
    let hash = partition_key_hash(partition_key);
    if hash > 0 {
        HashKeyRange::new(0, hash - 1).expect("range below key is valid")
    } else {
        HashKeyRange::new(1, u128::MAX).expect("range above key is valid")
    }
}

pub fn partition_keys(records: &[LogicalRecord]) -> Vec<&str> {
    records.iter().map(|r| r.partition_key.as_str()).collect()
}

pub fn payloads(records: &[LogicalRecord]) -> Vec<&[u8]> {
    records.iter().map(|r| r.data.as_ref()).collect()
}
