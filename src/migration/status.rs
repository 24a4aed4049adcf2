//! Migration status and batch reports

use crate::migration::plan::Direction;
use crate::migration::record::LedgerEntry;
use serde::Serialize;
use std::time::Duration;

/// Applied vs pending migrations at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    /// Ledger entries, ordered by name
    pub applied: Vec<LedgerEntry>,

    /// Resolvable migrations not yet in the ledger, in execution order
    pub pending: Vec<String>,

    pub total: usize,
    pub applied_count: usize,
    pub pending_count: usize,
}

impl MigrationStatus {
    #[must_use]
    pub fn new(applied: Vec<LedgerEntry>, pending: Vec<String>) -> Self {
        let applied_count = applied.len();
        let pending_count = pending.len();

        Self {
            applied,
            pending,
            total: applied_count + pending_count,
            applied_count,
            pending_count,
        }
    }

    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending_count == 0
    }

    #[must_use]
    pub fn latest_applied(&self) -> Option<&str> {
        self.applied.iter().map(|m| m.name.as_str()).max()
    }

    #[must_use]
    pub fn next_pending(&self) -> Option<&str> {
        self.pending.first().map(String::as_str)
    }
}

/// What a finished batch did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub direction: Direction,
    /// Migrations applied or reverted, in execution order
    pub migrations: Vec<String>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }
}
