//! Utility helpers for run identifiers, timestamps and content hashing.

mod hashing;
mod ids;
pub mod timestamps;

pub use hashing::{canonical_json, digest_hex, short_digest};
pub use ids::{generate_run_id, generate_uuid};
pub use timestamps::{iso_timestamp, now_utc, Timestamp};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uuid_is_valid() {
        let id = generate_uuid();
        assert_eq!(id.get_version_num(), 4);
    }

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with("+00:00"));
    }
}
