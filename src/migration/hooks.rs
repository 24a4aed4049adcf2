//! Batch lifecycle hooks
//!
//! Hooks bracket a whole batch, never a single migration. `before_batch` runs before the
//! session is opened (the lock id in the context is known up front); `after_batch` runs
//! after the session has been finished, on success and on failure alike, including when
//! the session could not be opened.

use crate::migration::error::MigrationError;
use crate::migration::plan::Direction;
use crate::migration::script::BatchParams;
use crate::migration::status::BatchReport;
use crate::migration::TableName;

/// What a hook knows about the running batch
#[derive(Debug, Clone, Copy)]
pub struct BatchContext<'a> {
    pub direction: Direction,
    /// Ledger table the batch is bookkept in
    pub table: &'a TableName,
    pub lock_id: i64,
    pub params: &'a BatchParams,
}

pub type BatchOutcome<'a> = std::result::Result<&'a BatchReport, &'a MigrationError>;

pub trait BatchHooks: Send + Sync {
    fn before_batch(&self, _ctx: &BatchContext<'_>) {}

    fn after_batch(&self, _ctx: &BatchContext<'_>, _outcome: BatchOutcome<'_>) {}
}

/// Default hooks: do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl BatchHooks for NoopHooks {}
