//! Migration-specific error types

use crate::connection::ConnectionError;
use crate::executor::DbError;
use crate::migration::plan::Direction;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = MigrationError> = std::result::Result<T, E>;

/// Migration-specific errors
///
/// Drift, lock-wait notices and unlock failures are only logged and never show up here.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The session could not be established (begin, lock query, ledger DDL)
    #[error("Migration setup failed while trying to {stage}: {source}")]
    Setup {
        stage: &'static str,
        #[source]
        source: DbError,
    },

    /// The advisory lock was not granted before the configured timeout
    #[error(
        "Timed out after {waited:?} waiting for migration lock {lock_id}. \
         Another process may be running migrations."
    )]
    LockTimeout { lock_id: i64, waited: Duration },

    /// An `up` or `down` action failed; the batch is rolled back
    #[error("Migration {name} threw: {message}")]
    ActionFailed {
        name: String,
        direction: Direction,
        message: String,
    },

    /// The action ran but its ledger row could not be written or deleted
    #[error("Migration {name} could not be recorded in the ledger: {source}")]
    LedgerWrite {
        name: String,
        direction: Direction,
        #[source]
        source: Box<MigrationError>,
    },

    /// Ledger bookkeeping or other statement failure inside a running batch
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Migrations directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No format handler is registered for the file's extension
    #[error("Unsupported migration format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A script migration file exists but no implementation was registered for it
    #[error("No script migration registered for '{0}'")]
    UnregisteredScript(String),

    #[error("Script migration '{0}' is already registered")]
    AlreadyRegistered(String),

    /// Two discovered files resolved to the same migration name
    #[error("Duplicate migration name '{0}'")]
    DuplicateName(String),

    /// A `To(name)` target that is neither pending nor applied
    #[error("Unknown migration '{0}'")]
    UnknownMigration(String),

    /// A ledger entry that has to be reverted no longer resolves to a file
    #[error(
        "Applied migration '{0}' cannot be reverted: its file is missing.\n\
         Suggestion: restore the file in the migrations directory"
    )]
    MissingMigration(String),

    /// A name given to `create` that cannot be used as part of a file name
    #[error("Invalid migration name '{0}'")]
    InvalidName(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl MigrationError {
    pub(crate) fn setup(stage: &'static str) -> impl FnOnce(DbError) -> Self {
        move |source| MigrationError::Setup { stage, source }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| MigrationError::Io { path, source }
    }

    /// Name of the migration that failed, if the failure belongs to one
    pub fn migration_name(&self) -> Option<&str> {
        match self {
            MigrationError::ActionFailed { name, .. } | MigrationError::LedgerWrite { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_failed_names_the_migration() {
        let err = MigrationError::ActionFailed {
            name: "002_seed.sql".to_string(),
            direction: Direction::Up,
            message: "relation \"users\" does not exist".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Migration 002_seed.sql threw: relation \"users\" does not exist"
        );
        assert_eq!(err.migration_name(), Some("002_seed.sql"));
    }

    #[test]
    fn test_ledger_write_names_the_migration() {
        let err = MigrationError::LedgerWrite {
            name: "001_init.sql".to_string(),
            direction: Direction::Up,
            source: Box::new(MigrationError::Database(DbError::Other(
                "current transaction is aborted".to_string(),
            ))),
        };
        assert_eq!(err.migration_name(), Some("001_init.sql"));
        assert_eq!(
            err.to_string(),
            "Migration 001_init.sql could not be recorded in the ledger: \
             Database error: Execution error: current transaction is aborted"
        );
    }

    #[test]
    fn test_setup_error_mentions_stage() {
        let err = MigrationError::setup("create the ledger table")(DbError::Other(
            "permission denied".to_string(),
        ));
        let msg = err.to_string();
        assert!(msg.contains("create the ledger table"));
        assert!(msg.contains("permission denied"));
        assert_eq!(err.migration_name(), None);
    }

    #[test]
    fn test_lock_timeout_display() {
        let err = MigrationError::LockTimeout {
            lock_id: 42,
            waited: Duration::from_secs(3),
        };
        assert!(err.to_string().contains("migration lock 42"));
        assert_eq!(err.migration_name(), None);
    }
}
