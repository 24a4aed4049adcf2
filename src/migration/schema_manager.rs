//! SchemaManager - query-construction helper handed to script migrations

use crate::executor::{DbError, SqlExecutor};
use may_postgres::types::ToSql;
use sea_query::{
    ColumnDef, IndexCreateStatement, IndexDropStatement, PostgresQueryBuilder, Table,
    TableAlterStatement, TableCreateStatement, TableDropStatement,
};
use std::fmt::Display;

/// Renders sea-query schema statements for Postgres and runs them on the batch transaction
///
/// # Example
/// ```rust,no_run
/// use sea_query::{Table, ColumnDef};
/// # fn example(manager: &slipway::migration::SchemaManager<'_>) -> Result<(), slipway::DbError> {
/// let table = Table::create()
///     .table("users")
///     .col(ColumnDef::new("id").integer().not_null().auto_increment().primary_key())
///     .col(ColumnDef::new("email").string().not_null())
///     .to_owned();
///
/// manager.create_table(table)?;
/// # Ok(())
/// # }
/// ```
pub struct SchemaManager<'a> {
    executor: &'a dyn SqlExecutor,
}

impl<'a> SchemaManager<'a> {
    pub fn new(executor: &'a dyn SqlExecutor) -> Self {
        Self { executor }
    }

    pub fn create_table(&self, table: TableCreateStatement) -> Result<(), DbError> {
        self.run(table.build(PostgresQueryBuilder))
    }

    pub fn drop_table(&self, table: TableDropStatement) -> Result<(), DbError> {
        self.run(table.build(PostgresQueryBuilder))
    }

    pub fn alter_table(&self, alter: TableAlterStatement) -> Result<(), DbError> {
        self.run(alter.build(PostgresQueryBuilder))
    }

    pub fn create_index(&self, index: IndexCreateStatement) -> Result<(), DbError> {
        self.run(index.build(PostgresQueryBuilder))
    }

    pub fn drop_index(&self, index: IndexDropStatement) -> Result<(), DbError> {
        self.run(index.build(PostgresQueryBuilder))
    }

    /// Add a column to an existing table
    ///
    /// ```rust,no_run
    /// # use sea_query::ColumnDef;
    /// # fn example(manager: &slipway::migration::SchemaManager<'_>) -> Result<(), slipway::DbError> {
    /// manager.add_column("users", ColumnDef::new("avatar_url").string().null().to_owned())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_column<T: Display>(&self, table: T, column: ColumnDef) -> Result<(), DbError> {
        let alter = Table::alter()
            .table(table.to_string())
            .add_column(column)
            .to_owned();
        self.alter_table(alter)
    }

    pub fn drop_column<T: Display>(&self, table: T, column: &str) -> Result<(), DbError> {
        let alter = Table::alter()
            .table(table.to_string())
            .drop_column(column.to_string())
            .to_owned();
        self.alter_table(alter)
    }

    pub fn rename_column<T: Display>(
        &self,
        table: T,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), DbError> {
        let alter = Table::alter()
            .table(table.to_string())
            .rename_column(old_name.to_string(), new_name.to_string())
            .to_owned();
        self.alter_table(alter)
    }

    /// Execute a parameterised statement
    pub fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, DbError> {
        self.executor.execute(sql, params)
    }

    pub fn executor(&self) -> &'a dyn SqlExecutor {
        self.executor
    }

    fn run(&self, sql: String) -> Result<(), DbError> {
        log::debug!("schema statement: {sql}");
        self.executor.execute(&sql, &[]).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::testing::RecordingExecutor;
    use sea_query::Index;

    #[test]
    fn test_create_and_drop_table_render_postgres() {
        let exec = RecordingExecutor::default();
        let manager = SchemaManager::new(&exec);

        manager
            .create_table(
                Table::create()
                    .table("widgets")
                    .col(ColumnDef::new("id").integer().not_null().primary_key())
                    .to_owned(),
            )
            .unwrap();
        manager
            .drop_table(Table::drop().table("widgets").to_owned())
            .unwrap();

        let statements = exec.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE \"widgets\""));
        assert_eq!(statements[1], "DROP TABLE \"widgets\"");
    }

    #[test]
    fn test_index_and_column_helpers() {
        let exec = RecordingExecutor::default();
        let manager = SchemaManager::new(&exec);

        manager
            .create_index(
                Index::create()
                    .name("idx_widgets_name")
                    .table("widgets")
                    .col("name")
                    .to_owned(),
            )
            .unwrap();
        manager.drop_column("widgets", "legacy").unwrap();
        manager.rename_column("widgets", "title", "name").unwrap();

        let statements = exec.statements();
        assert!(statements[0].contains("idx_widgets_name"));
        assert!(statements[1].contains("DROP COLUMN \"legacy\""));
        assert!(statements[2].contains("RENAME COLUMN \"title\" TO \"name\""));
    }
}
