//! UUID utilities

use crate::{Error, Result};
use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> std::result::Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Parse a UUID read back from a TEXT column
pub fn parse_stored(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(Error::decode)
}
