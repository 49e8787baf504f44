//! UUID utilities

use uuid::Uuid;

use crate::{Error, Result};

/// Parse a UUID, reporting failures as invalid input
pub fn parse(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::InvalidInput(format!("Invalid UUID '{}': {}", s, e)))
}

/// Parse a UUID read back from a TEXT column
pub fn from_db(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Corrupt UUID '{}' in database: {}", s, e)))
}
