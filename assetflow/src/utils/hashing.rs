//! Canonical serialization and content digests.
//!
//! Cache keys and fingerprints hash a canonical JSON rendering: object keys
//! are sorted recursively, so insertion order never perturbs a digest.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Renders a JSON value with recursively sorted object keys and no whitespace.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(v) = map.get(*key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Full SHA-256 digest of `data`, hex encoded.
#[must_use]
pub fn digest_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// First 16 bytes of the SHA-256 digest of `data`, hex encoded.
#[must_use]
pub fn short_digest(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    hex::encode(&hash[..16])
}
