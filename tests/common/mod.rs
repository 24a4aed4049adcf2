//! Shared fixtures for the Postgres-backed tests
//!
//! Set `TEST_DATABASE_URL` to run them; without it every test returns early.

#![allow(dead_code)]

use may_postgres::Client;
use slipway::migration::{Migrator, MigratorOptions, TableName};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn database_url() -> Option<String> {
    let _ = env_logger::builder().is_test(true).try_init();
    match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping");
            None
        }
    }
}

/// A migrations directory plus a ledger table and data-table prefix unique to one test
pub struct Fixture {
    pub url: String,
    pub dir: TempDir,
    /// Prefix for every table the test's migrations create
    pub prefix: String,
    pub ledger: String,
}

impl Fixture {
    pub fn new(url: String, test: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let prefix = format!("sw_{}_{}_{}", test, std::process::id(), n);
        let ledger = format!("{prefix}_ledger");
        Self {
            url,
            dir: tempfile::tempdir().expect("temp dir"),
            prefix,
            ledger,
        }
    }

    pub fn connect(&self) -> Client {
        slipway::connect(&self.url).expect("connect to TEST_DATABASE_URL")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn table(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }

    /// Write `migrations/<rel>`, replacing `{p}` with this fixture's table prefix
    pub fn write(&self, rel: &str, sql: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create migration dir");
        }
        fs::write(path, sql.replace("{p}", &self.prefix)).expect("write migration");
    }

    pub fn options(&self) -> MigratorOptions {
        MigratorOptions {
            migrations_path: self.dir.path().to_path_buf(),
            table: TableName::from(self.ledger.as_str()),
            ..MigratorOptions::default()
        }
    }

    pub fn migrator(&self) -> Migrator {
        Migrator::new(self.options())
    }

    pub fn ledger_names(&self, migrator: &Migrator) -> Vec<String> {
        migrator
            .executed(self.connect())
            .expect("read ledger")
            .into_iter()
            .map(|e| e.name)
            .collect()
    }

    pub fn table_exists(&self, name: &str) -> bool {
        let row = self
            .connect()
            .query_one("select to_regclass($1)::text", &[&self.table(name)])
            .expect("to_regclass");
        row.get::<_, Option<String>>(0).is_some()
    }

    pub fn count(&self, name: &str) -> i64 {
        let row = self
            .connect()
            .query_one(&format!("select count(*) from {}", self.table(name)), &[])
            .expect("count rows");
        row.get(0)
    }

    /// Drop the ledger and the given data tables
    pub fn cleanup(&self, tables: &[&str]) {
        let client = self.connect();
        let mut sql = format!("drop table if exists \"{}\";", self.ledger);
        for table in tables {
            sql.push_str(&format!("drop table if exists {} cascade;", self.table(table)));
        }
        if let Err(e) = client.batch_execute(&sql) {
            eprintln!("cleanup failed: {e}");
        }
    }
}
