//! Scaffolding for new migration files
//!
//! Only `Migrator::create` uses this; execution never looks at templates.

use crate::migration::resolver::{sql_down_path, MigrationFormat};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub const SQL_UP: &str = "-- Write your migration SQL here\n";

pub const SQL_DOWN: &str = "-- Write your rollback SQL here\n";

/// Skeleton for a script migration; `{name}` is replaced with the file name
pub const SCRIPT: &str = r#"//! Script migration {name}
//!
//! Register an instance under "{name}" in the `ScriptRegistry` passed to the migrator.

use slipway::migration::{ScriptContext, ScriptMigration, ScriptResult};

pub struct Migration;

impl ScriptMigration for Migration {
    fn up(&self, ctx: &ScriptContext<'_>) -> ScriptResult {
        ctx.tx.batch_execute("")?;
        Ok(())
    }

    fn down(&self, ctx: &ScriptContext<'_>) -> ScriptResult {
        ctx.tx.batch_execute("")?;
        Ok(())
    }
}
"#;

/// Given the path of a new migration, the files to write and their initial contents
pub trait TemplateProvider: Send + Sync {
    fn template(&self, path: &Path) -> Vec<(PathBuf, String)>;
}

/// SQL migrations get an up script plus its `down/` twin; `.rs` files get a
/// `ScriptMigration` skeleton.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTemplates;

impl TemplateProvider for DefaultTemplates {
    fn template(&self, path: &Path) -> Vec<(PathBuf, String)> {
        let is_script = path.extension().and_then(|e| e.to_str()) == Some("rs");
        if is_script {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            return vec![(path.to_path_buf(), SCRIPT.replace("{name}", name))];
        }

        vec![
            (path.to_path_buf(), SQL_UP.to_string()),
            (sql_down_path(path), SQL_DOWN.to_string()),
        ]
    }
}

pub fn extension(format: MigrationFormat) -> &'static str {
    match format {
        MigrationFormat::SqlPair => "sql",
        MigrationFormat::Script => "rs",
    }
}

/// `2024.01.20T12.00.00.add_users.sql`: the timestamp prefix keeps name order equal to
/// creation order
pub fn migration_file_name(now: DateTime<Utc>, name: &str, format: MigrationFormat) -> String {
    format!(
        "{}.{}.{}",
        now.format("%Y.%m.%dT%H.%M.%S"),
        name,
        extension(format)
    )
}

/// Names end up in file names and must not escape the migrations directory
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && !name.starts_with('.')
}
