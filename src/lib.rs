//! # Slipway
//!
//! Crash-safe PostgreSQL migrations for the `may` coroutine runtime.
//!
//! Every batch runs on a single connection inside a single transaction while holding an
//! advisory lock derived from the ledger table name. Concurrent runners queue up on the
//! lock, and a failing migration leaves nothing behind. See [`migration`] for the engine.

pub mod config;
pub mod connection;
pub mod executor;
pub mod metrics;
pub mod migration;
pub mod transaction;

pub use connection::{connect, ConnectionError};
pub use executor::{DbError, PgExecutor, SqlExecutor};
pub use migration::{Intent, MigrationError, Migrator, MigratorOptions};
