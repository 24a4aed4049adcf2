//! Transaction Module
//!
//! A top-level transaction on an exclusively owned `may_postgres::Client`. The migration
//! session runs a whole batch (lock, ledger writes, every migration action) inside one of
//! these.

use crate::executor::{run_batch, run_execute, run_query_all, run_query_one, DbError, SqlExecutor};
use may_postgres::types::ToSql;
use may_postgres::{Client, Row};

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// A database transaction
///
/// `BEGIN` is issued on creation. The transaction must be closed with [`commit`] or
/// [`rollback`]; afterwards every statement is refused with [`DbError::TransactionClosed`].
///
/// Postgres marks a transaction as aborted after any failing statement. A `COMMIT` sent to
/// an aborted transaction is answered with a rollback, so callers that need to know the
/// real outcome should track statement failures themselves.
///
/// [`commit`]: Transaction::commit
/// [`rollback`]: Transaction::rollback
pub struct Transaction {
    client: Client,
    closed: bool,
}

impl Transaction {
    /// Start a new transaction on `client`
    ///
    /// # Errors
    ///
    /// Returns `DbError` if `BEGIN` fails.
    pub fn begin(client: Client) -> Result<Self, DbError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::begin_transaction_span().entered();

        client.execute("BEGIN", &[]).map_err(DbError::from)?;

        Ok(Self {
            client,
            closed: false,
        })
    }

    /// Commit the transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is already closed or `COMMIT` fails.
    pub fn commit(&mut self) -> Result<(), DbError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::commit_transaction_span().entered();

        self.close("COMMIT")
    }

    /// Roll the transaction back
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is already closed or `ROLLBACK` fails.
    pub fn rollback(&mut self) -> Result<(), DbError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::rollback_transaction_span().entered();

        self.close("ROLLBACK")
    }

    fn close(&mut self, statement: &str) -> Result<(), DbError> {
        if self.closed {
            return Err(DbError::TransactionClosed);
        }
        // Closed even if the statement fails: the server side is unusable either way.
        self.closed = true;
        self.client
            .execute(statement, &[])
            .map(|_| ())
            .map_err(DbError::from)
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Check if the transaction is closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), DbError> {
        if self.closed {
            Err(DbError::TransactionClosed)
        } else {
            Ok(())
        }
    }
}

impl SqlExecutor for Transaction {
    fn execute(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, DbError> {
        self.ensure_open()?;
        run_execute(&self.client, query, params)
    }

    fn batch_execute(&self, sql: &str) -> Result<(), DbError> {
        self.ensure_open()?;
        run_batch(&self.client, sql)
    }

    fn query_one(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Row, DbError> {
        self.ensure_open()?;
        run_query_one(&self.client, query, params)
    }

    fn query_all(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, DbError> {
        self.ensure_open()?;
        run_query_all(&self.client, query, params)
    }
}
