//! Script migrations: compiled-in Rust code registered under a migration file name
//!
//! A `*.rs` file in the migrations directory marks the position of a script migration in
//! the ordering and supplies the content hash. The code itself is registered up front in a
//! [`ScriptRegistry`] under the same file name, so nothing is loaded at run time.

use crate::executor::SqlExecutor;
use crate::migration::error::{MigrationError, Result};
use crate::migration::SchemaManager;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied values available to every script migration of a batch
pub type BatchParams = HashMap<String, serde_json::Value>;

pub type ScriptError = Box<dyn std::error::Error + Send + Sync>;
pub type ScriptResult = std::result::Result<(), ScriptError>;

/// Everything a script migration gets to work with
pub struct ScriptContext<'a> {
    /// Name of the migration being run
    pub name: &'a str,
    /// The batch transaction
    pub tx: &'a dyn SqlExecutor,
    /// Query-construction helper bound to the same transaction
    pub schema: SchemaManager<'a>,
    pub params: &'a BatchParams,
}

impl<'a> ScriptContext<'a> {
    pub fn new(name: &'a str, tx: &'a dyn SqlExecutor, params: &'a BatchParams) -> Self {
        Self {
            name,
            tx,
            schema: SchemaManager::new(tx),
            params,
        }
    }
}

/// Trait that all script migrations implement
///
/// Both methods are synchronous: they run on `may` coroutines, where blocking calls yield.
///
/// # Example
///
/// ```rust,no_run
/// use slipway::migration::{ScriptContext, ScriptMigration, ScriptResult};
///
/// struct BackfillEmails;
///
/// impl ScriptMigration for BackfillEmails {
///     fn up(&self, ctx: &ScriptContext<'_>) -> ScriptResult {
///         ctx.tx.execute("UPDATE users SET email = lower(email)", &[])?;
///         Ok(())
///     }
///
///     fn down(&self, _ctx: &ScriptContext<'_>) -> ScriptResult {
///         Ok(())
///     }
/// }
/// ```
pub trait ScriptMigration: Send + Sync {
    fn up(&self, ctx: &ScriptContext<'_>) -> ScriptResult;

    fn down(&self, ctx: &ScriptContext<'_>) -> ScriptResult;
}

/// Script migrations keyed by migration file name (`003_backfill.rs`)
#[derive(Clone, Default)]
pub struct ScriptRegistry {
    scripts: HashMap<String, Arc<dyn ScriptMigration>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `migration` for the file called `name`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` if `name` is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        migration: impl ScriptMigration + 'static,
    ) -> Result<()> {
        let name = name.into();
        if self.scripts.contains_key(&name) {
            return Err(MigrationError::AlreadyRegistered(name));
        }
        self.scripts.insert(name, Arc::new(migration));
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, name: impl Into<String>, migration: impl ScriptMigration + 'static) -> Result<Self> {
        self.register(name, migration)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ScriptMigration>> {
        self.scripts.get(name).cloned()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.scripts.keys().collect();
        names.sort();
        f.debug_struct("ScriptRegistry").field("scripts", &names).finish()
    }
}
