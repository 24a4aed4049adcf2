//! Resolver - maps discovered files to executable migration units
//!
//! Dispatch is purely on file extension through a set of registered [`FormatHandler`]s.
//! `*.sql` files pair with a rollback script of the same name in a sibling `down/`
//! directory; `*.rs` files are backed by a [`ScriptRegistry`] entry.

use crate::executor::SqlExecutor;
use crate::migration::discovery::DiscoveredFile;
use crate::migration::error::{MigrationError, Result};
use crate::migration::plan::Direction;
use crate::migration::script::{BatchParams, ScriptContext, ScriptMigration, ScriptRegistry};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Directory (relative to an up script) holding SQL rollback scripts
pub const DOWN_DIR: &str = "down";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationFormat {
    SqlPair,
    Script,
}

/// The `up`/`down` pair of a migration
#[derive(Clone)]
pub enum MigrationAction {
    /// Literal SQL read from disk when run; never parameterised
    Sql { up: PathBuf, down: PathBuf },
    Script(Arc<dyn ScriptMigration>),
}

impl fmt::Debug for MigrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationAction::Sql { up, down } => f
                .debug_struct("Sql")
                .field("up", up)
                .field("down", down)
                .finish(),
            MigrationAction::Script(_) => f.write_str("Script(..)"),
        }
    }
}

/// A resolved, immutable migration
#[derive(Debug, Clone)]
pub struct MigrationUnit {
    /// Unique, sortable name (the file name); sort order is execution order
    pub name: String,
    pub path: PathBuf,
    pub action: MigrationAction,
}

impl MigrationUnit {
    pub fn sql(name: impl Into<String>, up: impl Into<PathBuf>) -> Self {
        let up = up.into();
        let down = sql_down_path(&up);
        Self {
            name: name.into(),
            path: up.clone(),
            action: MigrationAction::Sql { up, down },
        }
    }

    pub fn script(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        migration: Arc<dyn ScriptMigration>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            action: MigrationAction::Script(migration),
        }
    }

    pub fn format(&self) -> MigrationFormat {
        match self.action {
            MigrationAction::Sql { .. } => MigrationFormat::SqlPair,
            MigrationAction::Script(_) => MigrationFormat::Script,
        }
    }

    /// Run the `up` or `down` action on the batch transaction
    ///
    /// # Errors
    ///
    /// Any failure, including an unreadable SQL file, comes back as
    /// `MigrationError::ActionFailed` carrying this migration's name.
    pub fn run(
        &self,
        direction: Direction,
        tx: &dyn SqlExecutor,
        params: &BatchParams,
    ) -> Result<()> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::migration_span(&self.name, direction.as_str()).entered();

        let outcome: std::result::Result<(), String> = match &self.action {
            MigrationAction::Sql { up, down } => {
                let path = match direction {
                    Direction::Up => up,
                    Direction::Down => down,
                };
                fs::read_to_string(path)
                    .map_err(|e| format!("could not read {}: {e}", path.display()))
                    .and_then(|sql| tx.batch_execute(&sql).map_err(|e| e.to_string()))
            }
            MigrationAction::Script(script) => {
                let ctx = ScriptContext::new(&self.name, tx, params);
                let result = match direction {
                    Direction::Up => script.up(&ctx),
                    Direction::Down => script.down(&ctx),
                };
                result.map_err(|e| e.to_string())
            }
        };

        outcome.map_err(|message| MigrationError::ActionFailed {
            name: self.name.clone(),
            direction,
            message,
        })
    }
}

/// `migrations/001_init.sql` -> `migrations/down/001_init.sql`
pub fn sql_down_path(up: &Path) -> PathBuf {
    let parent = up.parent().unwrap_or_else(|| Path::new(""));
    match up.file_name() {
        Some(file_name) => parent.join(DOWN_DIR).join(file_name),
        None => parent.join(DOWN_DIR),
    }
}

/// Turns a discovered file of a given format into a [`MigrationUnit`]
pub trait FormatHandler: Send + Sync {
    /// Lower-case extensions (without the dot) this handler resolves
    fn extensions(&self) -> &[&'static str];

    fn resolve(&self, file: &DiscoveredFile) -> Result<MigrationUnit>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlHandler;

impl FormatHandler for SqlHandler {
    fn extensions(&self) -> &[&'static str] {
        &["sql"]
    }

    fn resolve(&self, file: &DiscoveredFile) -> Result<MigrationUnit> {
        Ok(MigrationUnit::sql(file.name.clone(), file.path.clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptHandler {
    registry: ScriptRegistry,
}

impl ScriptHandler {
    pub fn new(registry: ScriptRegistry) -> Self {
        Self { registry }
    }
}

impl FormatHandler for ScriptHandler {
    fn extensions(&self) -> &[&'static str] {
        &["rs"]
    }

    fn resolve(&self, file: &DiscoveredFile) -> Result<MigrationUnit> {
        let migration = self
            .registry
            .get(&file.name)
            .ok_or_else(|| MigrationError::UnregisteredScript(file.name.clone()))?;
        Ok(MigrationUnit::script(
            file.name.clone(),
            file.path.clone(),
            migration,
        ))
    }
}

/// Extension-dispatching resolver
pub struct Resolver {
    handlers: Vec<Box<dyn FormatHandler>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Resolver that understands SQL migrations
    pub fn new() -> Self {
        Self {
            handlers: vec![Box::new(SqlHandler)],
        }
    }

    /// Add a handler; later handlers win for extensions claimed twice
    pub fn with_handler(mut self, handler: impl FormatHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<&'static str> = self
            .handlers
            .iter()
            .flat_map(|h| h.extensions().iter().copied())
            .collect();
        exts.sort_unstable();
        exts.dedup();
        exts
    }

    /// # Errors
    ///
    /// `MigrationError::UnsupportedFormat` when no handler claims the extension, or the
    /// handler's own resolution error.
    pub fn resolve(&self, file: &DiscoveredFile) -> Result<MigrationUnit> {
        let handler = self
            .handlers
            .iter()
            .rev()
            .find(|h| h.extensions().contains(&file.extension.as_str()))
            .ok_or_else(|| MigrationError::UnsupportedFormat(file.path.clone()))?;
        handler.resolve(file)
    }

    /// Resolve every file, sorted by name
    ///
    /// # Errors
    ///
    /// Fails on the first unresolvable file or on a duplicate name.
    pub fn resolve_all(&self, files: &[DiscoveredFile]) -> Result<Vec<MigrationUnit>> {
        let mut units = files
            .iter()
            .map(|f| self.resolve(f))
            .collect::<Result<Vec<_>>>()?;
        units.sort_by(|a, b| a.name.cmp(&b.name));

        let mut seen = HashSet::new();
        for unit in &units {
            if !seen.insert(unit.name.as_str()) {
                return Err(MigrationError::DuplicateName(unit.name.clone()));
            }
        }
        Ok(units)
    }
}
