use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Cached response record captured by the cache layer.
///
/// The body is kept as the exact UTF-8 text the origin produced so replayed
/// responses are byte-identical, and `stored_at` feeds the
/// `X-Cache-Timestamp` header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheRecord {
    pub status: u16,
    pub body: String,
    pub stored_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl CacheRecord {
    pub fn new(status: u16, body: String, stored_at: DateTime<Utc>, tags: Vec<String>) -> Self {
        Self {
            status,
            body,
            stored_at,
            tags,
        }
    }
}

/// Trait representing a serialization strategy for cached records.
pub trait RecordCodec: Send + Sync + Clone + 'static {
    fn encode(&self, record: &CacheRecord) -> Result<Vec<u8>, CacheError>;
    fn decode(&self, bytes: &[u8]) -> Result<CacheRecord, CacheError>;
}

/// Default [`RecordCodec`] backed by `serde_json`.
///
/// JSON keeps stored entries inspectable with standard Redis tooling.
#[derive(Clone, Default)]
pub struct JsonCodec;

impl RecordCodec for JsonCodec {
    fn encode(&self, record: &CacheRecord) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(record).map_err(|err| CacheError::Codec(err.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<CacheRecord, CacheError> {
        serde_json::from_slice(bytes).map_err(|err| CacheError::Codec(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_records() {
        let codec = JsonCodec;
        let record = CacheRecord::new(
            200,
            r#"{"products":[]}"#.to_owned(),
            Utc::now(),
            vec!["products".to_owned()],
        );

        let encoded = codec.encode(&record).expect("encode succeeds");
        let decoded = codec.decode(&encoded).expect("decode succeeds");
        assert_eq!(decoded, record);
    }

    #[test]
    fn empty_tags_are_omitted_and_default() {
        let codec = JsonCodec;
        let record = CacheRecord::new(200, "{}".to_owned(), Utc::now(), Vec::new());

        let encoded = codec.encode(&record).expect("encode succeeds");
        let text = String::from_utf8(encoded.clone()).expect("utf-8");
        assert!(!text.contains("tags"));

        let decoded = codec.decode(&encoded).expect("decode succeeds");
        assert!(decoded.tags.is_empty());
    }

    #[test]
    fn corrupt_records_fail_to_decode() {
        let codec = JsonCodec;
        assert!(codec.decode(b"not json").is_err());
        assert!(codec.decode(b"{\"status\":200}").is_err());
    }
}
