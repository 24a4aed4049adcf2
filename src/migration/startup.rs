//! In-process migration on application startup

use crate::config::MigratorConfig;
use crate::connection::connect;
use crate::migration::error::Result;
use crate::migration::migrator::{Migrator, MigratorOptions};
use crate::migration::plan::Intent;
use crate::migration::script::{BatchParams, ScriptRegistry};
use crate::migration::status::BatchReport;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Apply every pending migration before the application starts serving
///
/// Safe to call from every replica of a multi-instance deployment: the first process to
/// take the advisory lock runs the batch, the others wait for it and then find nothing
/// pending. Fails fast; an application should not start on a failed migration.
///
/// # Example
///
/// ```rust,no_run
/// use slipway::config::MigratorConfig;
/// use slipway::migration::{startup::run_pending, ScriptRegistry};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = MigratorConfig::load()?;
///     run_pending(&config, ScriptRegistry::new())?;
///     // Continue with application startup...
///     Ok(())
/// }
/// ```
pub fn run_pending(config: &MigratorConfig, registry: ScriptRegistry) -> Result<BatchReport> {
    let client = {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::acquire_connection_span().entered();
        connect(&config.database.url)?
    };

    let migrator =
        Migrator::new(MigratorOptions::from(&config.migrations)).with_scripts(registry);
    let report = migrator.up(client, Intent::All, &BatchParams::new())?;

    if report.is_empty() {
        log::debug!("No pending migrations to apply on startup");
    } else {
        log::info!("Applied {} migration(s) on startup", report.len());
    }
    Ok(report)
}
