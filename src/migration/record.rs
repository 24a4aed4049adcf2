//! `LedgerEntry` - one row of the ledger table

use crate::executor::DbError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A migration recorded as applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// Migration name (primary key)
    pub name: String,
    /// Fingerprint written when the migration was applied
    pub hash: String,
    /// When the migration was applied
    pub applied_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(name: impl Into<String>, hash: impl Into<String>, applied_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
            applied_at,
        }
    }

    /// Decode a `name, hash, date` row
    ///
    /// # Errors
    ///
    /// Returns `DbError::Decode` if a column is missing or has an unexpected type.
    pub fn from_row(row: &may_postgres::Row) -> Result<Self, DbError> {
        let decode = |column: &str, e: may_postgres::Error| {
            DbError::Decode(format!("ledger column '{column}': {e}"))
        };

        let name: String = row.try_get("name").map_err(|e| decode("name", e))?;
        let hash: String = row.try_get("hash").map_err(|e| decode("hash", e))?;
        let applied_at: DateTime<Utc> = row.try_get("date").map_err(|e| decode("date", e))?;

        Ok(Self {
            name,
            hash,
            applied_at,
        })
    }
}
