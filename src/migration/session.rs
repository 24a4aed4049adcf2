//! Migration session: one connection, one advisory lock, one transaction
//!
//! A [`Session`] is opened at the start of a batch and finished exactly once at the end.
//! Every migration action and ledger write of the batch runs inside its transaction, so the
//! batch commits or aborts as a whole. The advisory lock serialises batches across every
//! process that points at the same ledger table.

use crate::executor::{DbError, SqlExecutor};
use crate::migration::error::{MigrationError, Result};
use crate::migration::lock_key::advisory_lock_id;
use crate::migration::TableName;
use crate::transaction::Transaction;
use may_postgres::Client;
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// How long and how eagerly to wait for the advisory lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSettings {
    /// Give up after this long; `None` waits until the lock is granted
    pub timeout: Option<Duration>,
    /// Log a single "waiting" notice once this much time has passed
    pub notice_after: Duration,
    /// Delay between `pg_try_advisory_lock` attempts
    pub poll_interval: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            timeout: None,
            notice_after: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Exclusive lock + transaction for the duration of one batch
///
/// Dropping a session that was never finished rolls it back and releases the lock.
pub struct Session {
    tx: Transaction,
    lock_id: i64,
    locked: bool,
    released: bool,
}

impl Session {
    /// Begin a transaction on `client` and take the ledger's advisory lock inside it
    ///
    /// Contention is resolved by waiting: the lock is polled until granted, with one
    /// informational notice once `settings.notice_after` has elapsed. Only an explicit
    /// `settings.timeout` turns waiting into an error.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Setup` if the transaction or the lock query fails and
    /// `MigrationError::LockTimeout` if the timeout expires. In both cases the session has
    /// already been finished with a rollback.
    pub fn open(client: Client, table: &TableName, settings: &LockSettings) -> Result<Self> {
        let lock_id = advisory_lock_id(table);

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::session_span(lock_id).entered();

        let tx = Transaction::begin(client)
            .map_err(MigrationError::setup("begin the migration transaction"))?;

        let mut session = Self {
            tx,
            lock_id,
            locked: false,
            released: false,
        };

        if let Err(e) = session.acquire(settings) {
            if let Err(finish_err) = session.finish(false) {
                log::error!("Failed to finish migration session after lock failure: {finish_err}");
            }
            return Err(e);
        }

        Ok(session)
    }

    fn acquire(&mut self, settings: &LockSettings) -> Result<()> {
        let start = Instant::now();
        let mut noticed = false;

        loop {
            let row = self
                .tx
                .query_one("SELECT pg_try_advisory_lock($1)", &[&self.lock_id])
                .map_err(MigrationError::setup("acquire the migration lock"))?;
            let granted: bool = row
                .try_get(0)
                .map_err(|e| MigrationError::setup("acquire the migration lock")(DbError::from(e)))?;

            let waited = start.elapsed();
            if granted {
                self.locked = true;
                #[cfg(feature = "metrics")]
                METRICS.observe_lock_wait(waited);
                log::debug!("Acquired migration lock {} after {:?}", self.lock_id, waited);
                return Ok(());
            }

            if let Some(timeout) = settings.timeout {
                if waited >= timeout {
                    return Err(MigrationError::LockTimeout {
                        lock_id: self.lock_id,
                        waited,
                    });
                }
            }

            if !noticed && waited >= settings.notice_after {
                log::info!("Waiting for lock... (advisory lock {})", self.lock_id);
                noticed = true;
            }

            may::coroutine::sleep(settings.poll_interval);
        }
    }

    /// Release the lock and resolve the transaction
    ///
    /// Runs at most once; later calls are no-ops. The unlock is attempted first and its
    /// failure is only logged. `commit = true` sends `COMMIT`, which Postgres turns into a
    /// rollback if any statement in the batch failed; callers that saw a failure pass
    /// `false` to roll back explicitly.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Database` if `COMMIT`/`ROLLBACK` itself fails.
    pub fn finish(&mut self, commit: bool) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let unlocked = self.unlock();

        let outcome = if commit {
            self.tx.commit()
        } else {
            self.tx.rollback()
        };

        // Session-level advisory locks survive ROLLBACK. If the unlock failed because the
        // transaction was already aborted, the connection can unlock again now it is idle.
        if self.locked && !unlocked {
            match self
                .tx
                .client()
                .execute("SELECT pg_advisory_unlock($1)", &[&self.lock_id])
            {
                Ok(_) => log::debug!("Released migration lock {} after transaction end", self.lock_id),
                Err(e) => log::error!(
                    "Failed to release migration lock {} after transaction end: {e}",
                    self.lock_id
                ),
            }
        }

        outcome.map_err(MigrationError::from)
    }

    fn unlock(&self) -> bool {
        let released = self
            .tx
            .query_one("SELECT pg_advisory_unlock($1)", &[&self.lock_id])
            .and_then(|row| row.try_get::<_, bool>(0).map_err(DbError::from));

        match released {
            Ok(true) => true,
            Ok(false) => {
                log::error!(
                    "Failed to unlock. This is expected if the lock acquisition timed out. (lock {} was not held)",
                    self.lock_id
                );
                false
            }
            Err(e) => {
                log::error!(
                    "Failed to unlock. This is expected if the lock acquisition timed out. Original error: {e}"
                );
                false
            }
        }
    }

    /// The shared transaction every action and ledger write of the batch runs on
    pub fn executor(&self) -> &dyn SqlExecutor {
        &self.tx
    }

    pub fn lock_id(&self) -> i64 {
        self.lock_id
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.finish(false) {
                log::error!("Failed to roll back abandoned migration session: {e}");
            }
        }
    }
}
