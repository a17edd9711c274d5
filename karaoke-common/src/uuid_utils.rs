//! UUID utilities

use crate::{Error, Result};
use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a UUID stored as TEXT in the database
///
/// `column` names the source column so corrupt rows are easy to track down.
pub fn parse_column(value: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid UUID in {}: {} ({})", column, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_roundtrip() {
        let id = generate();
        assert_eq!(parse_column(&id.to_string(), "queue_id").unwrap(), id);
    }

    #[test]
    fn test_parse_column_rejects_garbage() {
        let err = parse_column("not-a-uuid", "event_id").unwrap_err();
        assert!(err.to_string().contains("event_id"));
    }
}
