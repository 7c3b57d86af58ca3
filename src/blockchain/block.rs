use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::digest;
use super::{GENESIS_PAYLOAD, GENESIS_PREV_DIGEST};
use crate::error::Result;
use crate::exam::ExamReading;

/// What a block carries.
///
/// Readings are the normal case; the genesis block holds a plain note. Any
/// other JSON found in a restored ledger is kept verbatim as `Raw` so its
/// digest still verifies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Exam(ExamReading),
    Note(String),
    Raw(serde_json::Value),
}

impl Payload {
    pub fn genesis() -> Self {
        Payload::Note(GENESIS_PAYLOAD.to_string())
    }

    pub fn as_exam(&self) -> Option<&ExamReading> {
        match self {
            Payload::Exam(reading) => Some(reading),
            _ => None,
        }
    }
}

impl From<ExamReading> for Payload {
    fn from(reading: ExamReading) -> Self {
        Payload::Exam(reading)
    }
}

/// A single block in the ledger holding one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64, // seconds since the Unix epoch (UTC)
    #[serde(rename = "dados")]
    pub payload: Payload,
    #[serde(rename = "hash_anterior")]
    pub prev_digest: String,
    pub nonce: u64, // Proof-of-Work nonce
    #[serde(rename = "hash_atual")]
    pub digest: String, // Cached digest of the five fields above
}

impl Block {
    /// Create the genesis block (first block in the chain).
    pub fn genesis() -> Result<Self> {
        Self::new(0, Payload::genesis(), GENESIS_PREV_DIGEST)
    }

    /// Create a new block stamped with the current time (not sealed yet).
    pub fn new(index: u64, payload: Payload, prev_digest: impl Into<String>) -> Result<Self> {
        Self::with_timestamp(index, now_timestamp(), payload, prev_digest)
    }

    pub fn with_timestamp(
        index: u64,
        timestamp: f64,
        payload: Payload,
        prev_digest: impl Into<String>,
    ) -> Result<Self> {
        let mut block = Self {
            index,
            timestamp,
            payload,
            prev_digest: prev_digest.into(),
            nonce: 0,
            digest: String::new(),
        };
        block.digest = block.recompute_digest()?;
        Ok(block)
    }

    /// Digest of the current field values. Does not update `digest`.
    pub fn recompute_digest(&self) -> Result<String> {
        digest::hash(
            self.index,
            self.timestamp,
            &self.payload,
            &self.prev_digest,
            self.nonce,
        )
    }

    /// Whether the cached digest matches the block's content.
    pub fn is_self_consistent(&self) -> bool {
        self.recompute_digest()
            .map(|expected| expected == self.digest)
            .unwrap_or(false)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_digest == GENESIS_PREV_DIGEST
    }

    /// Creation time as a UTC datetime, if the stored timestamp is representable.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        if !self.timestamp.is_finite() {
            return None;
        }
        let secs = self.timestamp.floor();
        let nanos = ((self.timestamp - secs) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
    }
}

/// Current time in seconds since the epoch, microsecond resolution.
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::{Block, Payload};
    use crate::exam::ExamReading;
    use serde_json::json;

    fn reading(value: f64) -> Payload {
        Payload::Exam(ExamReading::new(value).unwrap())
    }

    #[test]
    fn genesis_has_valid_digest() {
        let b = Block::genesis().unwrap();
        assert_eq!(b.index, 0);
        assert_eq!(b.prev_digest, "0");
        assert_eq!(b.nonce, 0);
        assert_eq!(b.payload, Payload::Note("Bloco Gênesis".into()));
        assert!(b.is_genesis());
        assert!(b.is_self_consistent());
    }

    #[test]
    fn recompute_does_not_mutate() {
        let mut b = Block::new(1, reading(95.0), "prev").unwrap();
        let cached = b.digest.clone();
        b.nonce = 10;
        let fresh = b.recompute_digest().unwrap();
        assert_ne!(fresh, cached);
        assert_eq!(b.digest, cached);
        assert!(!b.is_self_consistent());
    }

    #[test]
    fn invalid_when_payload_tampered() {
        let mut b = Block::new(2, reading(110.0), "prev").unwrap();
        assert!(b.is_self_consistent());
        b.payload = reading(111.0);
        assert!(!b.is_self_consistent());
    }

    #[test]
    fn created_at_tracks_timestamp() {
        let b = Block::with_timestamp(1, 1700000000.5, reading(90.0), "0").unwrap();
        let at = b.created_at().unwrap();
        assert_eq!(at.timestamp(), 1700000000);
        assert_eq!(at.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn persisted_field_names() {
        let b = Block::with_timestamp(1, 1700000000.5, reading(95.0), "abc").unwrap();
        let value = serde_json::to_value(&b).unwrap();
        assert_eq!(value["index"], json!(1));
        assert_eq!(value["timestamp"], json!(1700000000.5));
        assert_eq!(value["dados"], json!({ "glicose": 95.0 }));
        assert_eq!(value["hash_anterior"], json!("abc"));
        assert_eq!(value["nonce"], json!(0));
        assert_eq!(value["hash_atual"], json!(b.digest));
    }

    #[test]
    fn payload_variants_deserialize() {
        let exam: Payload = serde_json::from_value(json!({ "glicose": 95.0 })).unwrap();
        assert!(exam.as_exam().is_some());

        let note: Payload = serde_json::from_value(json!("Bloco Gênesis")).unwrap();
        assert_eq!(note, Payload::genesis());

        let raw: Payload =
            serde_json::from_value(json!({ "glicose": 95.0, "unit": "mg/dL" })).unwrap();
        assert!(matches!(raw, Payload::Raw(_)));

        let seq: Payload = serde_json::from_value(json!([95.0])).unwrap();
        assert_eq!(seq, Payload::Raw(json!([95.0])));
        assert_eq!(serde_json::to_value(&seq).unwrap(), json!([95.0]));
    }
}
