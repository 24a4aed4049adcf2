//! Content fingerprints for the ledger `hash` column

use crate::migration::error::{MigrationError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Number of hex characters kept from the digest
const HASH_LEN: usize = 10;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// How the ledger fingerprints a migration
///
/// Both strategies are always available and chosen explicitly through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashStrategy {
    /// Hash the whitespace-normalised file content; edits after deployment show up as drift
    #[default]
    Content,
    /// The migration name is its own hash; drift detection is effectively off
    Name,
}

impl HashStrategy {
    /// Fingerprint for the migration `name` stored at `path`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Io` if the content strategy cannot read the file.
    pub fn hash(&self, name: &str, path: &Path) -> Result<String> {
        match self {
            HashStrategy::Content => content_hash(path),
            HashStrategy::Name => Ok(name.to_string()),
        }
    }
}

/// Hash of a migration file's content
///
/// Leading/trailing whitespace is dropped and every whitespace run becomes one space, so
/// reformatting line endings or indentation does not count as drift.
pub fn content_hash(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(MigrationError::io(path))?;
    Ok(hash_text(&content))
}

pub(crate) fn hash_text(content: &str) -> String {
    let normalized = WHITESPACE.replace_all(content.trim(), " ");
    let digest = Sha256::digest(normalized.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(HASH_LEN);
    hex
}
