//! Advisory lock id derivation

use crate::migration::TableName;
use sha2::{Digest, Sha256};

const LOCK_NAMESPACE: &str = "slipway advisory lock:";

/// Advisory lock id for a ledger table
///
/// The first 8 hex digits of SHA-256 over the namespaced JSON form of the table name,
/// read as an unsigned 32-bit integer. Stable across processes and releases, so every
/// runner pointed at the same ledger contends for the same lock.
pub fn advisory_lock_id(table: &TableName) -> i64 {
    // Serialising a `TableName` (string or list of strings) cannot fail.
    let json = serde_json::to_string(table).unwrap_or_else(|_| table.to_string());
    let digest = Sha256::digest(format!("{LOCK_NAMESPACE}{json}").as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    i64::from(prefix)
}
