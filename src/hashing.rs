//! Hashing System - SHA-256 fingerprints for documents and requests
//!
//! The same document always hashes the same, whatever order its JSON keys
//! were written in.

use sha2::{Sha256, Digest};
use serde::Serialize;
use serde_json::{Value, to_string};

use crate::document::Document;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => {
            Value::Array(arr.iter().map(sort_value).collect())
        }
        _ => v.clone()
    }
}

/// Content hash of a processed document, carried in its metadata
pub fn compute_content_hash(document: &Document) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(document)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Compute job hash for a pipeline run
/// job_hash = sha256(canonical_request + engine_version)
pub fn compute_job_hash(
    request: &impl Serialize,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical_request = canonical_json(request)?;
    let combined = format!("{}:{}", canonical_request, engine_version);
    Ok(sha256_hex(combined.as_bytes()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Element, ViewBox};
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let h = sha256_hex(b"");
        assert_eq!(h, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }

    #[test]
    fn test_content_hash_tracks_content() {
        let doc = Document::new(ViewBox::new(0.0, 0.0, 10.0, 10.0), vec![Element::circle(1.0, 1.0, 1.0)]);
        let h1 = compute_content_hash(&doc).unwrap();
        let h2 = compute_content_hash(&doc.clone()).unwrap();
        assert_eq!(h1, h2);

        let moved = Document::new(ViewBox::new(0.0, 0.0, 10.0, 10.0), vec![Element::circle(2.0, 1.0, 1.0)]);
        assert_ne!(h1, compute_content_hash(&moved).unwrap());
    }

    #[test]
    fn test_job_hash_includes_engine_version() {
        let request = json!({"elements": []});
        let a = compute_job_hash(&request, "1.0.0").unwrap();
        let b = compute_job_hash(&request, "1.0.1").unwrap();
        assert_ne!(a, b);
    }
}
