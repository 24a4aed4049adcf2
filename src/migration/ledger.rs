//! Ledger - the persisted table of applied migrations
//!
//! Columns: `name text primary key`, `hash text not null`,
//! `date timestamptz not null default now()`. Every write happens on the batch
//! transaction, next to the migration action it records.

use crate::executor::SqlExecutor;
use crate::migration::checksum::HashStrategy;
use crate::migration::error::{MigrationError, Result};
use crate::migration::record::LedgerEntry;
use crate::migration::resolver::MigrationUnit;
use crate::migration::TableName;
use std::collections::HashMap;

/// Discrepancy between the ledger and the migrations on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    /// The file changed after it was applied
    Modified {
        name: String,
        stored: String,
        current: String,
    },
    /// The ledger lists a migration that is no longer discoverable
    Missing { name: String },
    /// The file exists but could not be hashed
    Unreadable { name: String, error: String },
}

impl Drift {
    pub fn name(&self) -> &str {
        match self {
            Drift::Modified { name, .. } | Drift::Missing { name } | Drift::Unreadable { name, .. } => {
                name
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    table: TableName,
    strategy: HashStrategy,
    quoted: String,
}

impl Ledger {
    pub fn new(table: TableName, strategy: HashStrategy) -> Self {
        let quoted = table.to_sql();
        Self {
            table,
            strategy,
            quoted,
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn strategy(&self) -> HashStrategy {
        self.strategy
    }

    /// Create the ledger table if it does not exist yet; safe to call on every access
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Setup` if the DDL fails.
    pub fn ensure_table(&self, tx: &dyn SqlExecutor) -> Result<()> {
        let sql = format!(
            "create table if not exists {}(\
                name text primary key, \
                hash text not null, \
                date timestamptz not null default now()\
            )",
            self.quoted
        );
        tx.execute(&sql, &[])
            .map(|_| ())
            .map_err(MigrationError::setup("create the ledger table"))
    }

    /// Applied migrations ordered by name, with drift logged as warnings
    ///
    /// `units` are the currently resolvable migrations; each ledger row's stored hash is
    /// compared against the hash recomputed from its unit. Drift never fails the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be created or read.
    pub fn list_applied(
        &self,
        tx: &dyn SqlExecutor,
        units: &[MigrationUnit],
    ) -> Result<Vec<LedgerEntry>> {
        self.ensure_table(tx)?;

        let sql = format!("select name, hash, date from {} order by name", self.quoted);
        let rows = tx
            .query_all(&sql, &[])
            .map_err(MigrationError::setup("read the ledger table"))?;

        let entries = rows
            .iter()
            .map(LedgerEntry::from_row)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for drift in self.detect_drift(&entries, units) {
            self.warn_drift(&drift);
        }

        Ok(entries)
    }

    /// Compare ledger entries against the resolvable migrations
    pub fn detect_drift(&self, entries: &[LedgerEntry], units: &[MigrationUnit]) -> Vec<Drift> {
        let by_name: HashMap<&str, &MigrationUnit> =
            units.iter().map(|u| (u.name.as_str(), u)).collect();

        entries
            .iter()
            .filter_map(|entry| {
                let Some(unit) = by_name.get(entry.name.as_str()) else {
                    return Some(Drift::Missing {
                        name: entry.name.clone(),
                    });
                };
                match self.hash(unit) {
                    Ok(current) if current == entry.hash => None,
                    Ok(current) => Some(Drift::Modified {
                        name: entry.name.clone(),
                        stored: entry.hash.clone(),
                        current,
                    }),
                    Err(e) => Some(Drift::Unreadable {
                        name: entry.name.clone(),
                        error: e.to_string(),
                    }),
                }
            })
            .collect()
    }

    fn warn_drift(&self, drift: &Drift) {
        match drift {
            Drift::Modified {
                name,
                stored,
                current,
            } => log::warn!(
                "hash in '{}' table didn't match content on disk. \
                 did you try to change a migration file after it had been run? \
                 migration={name} db_hash={stored} disk_hash={current}",
                self.table
            ),
            Drift::Missing { name } => log::warn!(
                "migration '{name}' is recorded in '{}' but was not found on disk",
                self.table
            ),
            Drift::Unreadable { name, error } => log::warn!(
                "could not hash migration '{name}' recorded in '{}': {error}",
                self.table
            ),
        }
    }

    /// Fingerprint of `unit` under the configured strategy
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Io` if the file cannot be read.
    pub fn hash(&self, unit: &MigrationUnit) -> Result<String> {
        self.strategy.hash(&unit.name, &unit.path)
    }

    /// Insert `(name, hash)` on the batch transaction
    ///
    /// # Errors
    ///
    /// Returns an error if hashing or the insert fails.
    pub fn record_applied(&self, tx: &dyn SqlExecutor, unit: &MigrationUnit) -> Result<()> {
        let hash = self.hash(unit)?;
        let sql = format!("insert into {}(name, hash) values ($1, $2)", self.quoted);
        tx.execute(&sql, &[&unit.name, &hash])?;
        Ok(())
    }

    /// Delete the row for `name` on the batch transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn record_reverted(&self, tx: &dyn SqlExecutor, name: &str) -> Result<()> {
        let sql = format!("delete from {} where name = $1", self.quoted);
        tx.execute(&sql, &[&name])?;
        Ok(())
    }
}
