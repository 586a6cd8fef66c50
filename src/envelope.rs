//! Detection and verification of the KPL aggregation envelope
//!
//! An aggregated record is laid out as:
//!
//! ```text
//! +----------------+---------------------------+-------------------+
//! | magic (4 B)    | AggregatedRecord protobuf | MD5 of body (16 B)|
//! +----------------+---------------------------+-------------------+
//! ```
//!
//! Detection works on sub-slices of the record's bytes; a record that turns
//! out not to be aggregated is handed on untouched.

/// Marker the KPL writes at the start of every aggregated record.
pub const AGGREGATED_RECORD_MAGIC: [u8; 4] = [0xF3, 0x89, 0x9A, 0xC2];

/// Length of the trailing MD5 digest.
pub const DIGEST_SIZE: usize = 16;

/// Why a record was treated as a plain, non-aggregated record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotAggregated {
    /// Fewer bytes than the magic prefix
    TooShort,
    /// Prefix differs from the magic bytes
    MagicMismatch,
    /// No room for the trailing digest after the magic prefix
    MissingDigest,
    /// Trailing digest does not match the body
    DigestMismatch,
}

/// A verified envelope borrowed from a record's data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationEnvelope<'a> {
    pub message_body: &'a [u8],
    pub digest: &'a [u8; DIGEST_SIZE],
}

/// Outcome of inspecting one record's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    Aggregated(AggregationEnvelope<'a>),
    Single(NotAggregated),
}

/// Split `data` into body and digest if it starts with the magic prefix.
///
/// Does not check the digest; see [`verify`].
pub fn detect(data: &[u8]) -> Result<AggregationEnvelope<'_>, NotAggregated> {
    if data.len() < AGGREGATED_RECORD_MAGIC.len() {
        return Err(NotAggregated::TooShort);
    }

    let (magic, rest) = data.split_at(AGGREGATED_RECORD_MAGIC.len());
    if magic != AGGREGATED_RECORD_MAGIC {
        return Err(NotAggregated::MagicMismatch);
    }

    if rest.len() < DIGEST_SIZE {
        return Err(NotAggregated::MissingDigest);
    }

    let (message_body, digest) = rest.split_at(rest.len() - DIGEST_SIZE);
    let digest: &[u8; DIGEST_SIZE] = digest
        .try_into()
        .map_err(|_| NotAggregated::MissingDigest)?;

    Ok(AggregationEnvelope {
        message_body,
        digest,
    })
}

/// Check the envelope's trailing digest against its body.
pub fn verify(envelope: &AggregationEnvelope<'_>) -> Result<(), NotAggregated> {
    let calculated = md5::compute(envelope.message_body);
    if calculated.0 == *envelope.digest {
        Ok(())
    } else {
        Err(NotAggregated::DigestMismatch)
    }
}

/// Detect and verify in one step.
pub fn inspect(data: &[u8]) -> Frame<'_> {
    match detect(data).and_then(|envelope| verify(&envelope).map(|_| envelope)) {
        Ok(envelope) => Frame::Aggregated(envelope),
        Err(reason) => Frame::Single(reason),
    }
}
