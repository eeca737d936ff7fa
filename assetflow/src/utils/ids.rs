//! Identifier generation.

use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a run identifier.
///
/// Run ids are time-ordered (UUID v7) so persisted run records sort by start.
#[must_use]
pub fn generate_run_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        let a = generate_run_id();
        let b = generate_run_id();
        assert_ne!(a, b);
        assert_eq!(Uuid::parse_str(&a).map(|u| u.get_version_num()).ok(), Some(7));
    }
}
