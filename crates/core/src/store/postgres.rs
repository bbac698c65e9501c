//! PostgreSQL store
//!
//! Implements [`MigrationStore`] against one service table. Each migration
//! unit runs inside its own transaction: the script statements and the
//! active-flag update commit together or roll back together.

use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use super::MigrationStore;
use crate::definitions::{
    encode_dependencies, parse_dependencies, MigrationId, MigrationRecord, MigratorConfig,
    NewMigration,
};
use crate::error::{MigratorError, MigratorResult};

/// Migration store backed by a PostgreSQL service table.
pub struct PostgresStore {
    pool: PgPool,
    config: MigratorConfig,
}

impl PostgresStore {
    /// Connect a new pool and wrap it
    pub async fn connect(database_url: &str, config: MigratorConfig) -> MigratorResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| MigratorError::Store(format!("Failed to connect to database: {}", e)))?;
        Ok(Self::new(pool, config))
    }

    /// Wrap an existing pool
    pub fn new(pool: PgPool, config: MigratorConfig) -> Self {
        Self { pool, config }
    }

    /// Name of the service table
    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    /// SQL to create the service table
    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id BIGSERIAL PRIMARY KEY,\n    \
                up_script TEXT NOT NULL,\n    \
                down_script TEXT NOT NULL,\n    \
                comment TEXT NOT NULL DEFAULT '',\n    \
                dependencies TEXT,\n    \
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,\n    \
                is_active BOOLEAN NOT NULL DEFAULT FALSE\n\
            );",
            self.config.table_name
        )
    }

    /// SQL to check whether the service table exists in the search-path
    /// schema. A same-named table elsewhere must not count.
    pub fn table_exists_sql(&self) -> String {
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_name = $1 AND table_schema = current_schema())"
            .to_string()
    }

    /// SQL to fetch every record
    pub fn fetch_all_sql(&self) -> String {
        format!(
            "SELECT id, up_script, down_script, comment, dependencies, created_at, is_active \
             FROM {} ORDER BY id",
            self.config.table_name
        )
    }

    /// SQL to insert a record
    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (up_script, down_script, comment, dependencies, created_at, is_active) \
             VALUES ($1, $2, $3, $4, $5, FALSE) RETURNING id",
            self.config.table_name
        )
    }

    /// SQL to update a record's active flag
    pub fn set_active_sql(&self) -> String {
        format!(
            "UPDATE {} SET is_active = $1 WHERE id = $2",
            self.config.table_name
        )
    }

    /// Split a script into executable statements using proper SQL parsing
    pub fn split_sql_statements(&self, sql: &str) -> MigratorResult<Vec<String>> {
        let dialect = GenericDialect {};
        let mut statements = Vec::new();

        match Parser::parse_sql(&dialect, sql) {
            Ok(parsed_statements) => {
                for stmt in parsed_statements {
                    statements.push(format!("{};", stmt));
                }
                Ok(statements)
            }
            Err(e) => {
                // If parsing fails, fall back to naive semicolon splitting
                tracing::warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
                let naive_statements = sql
                    .split(';')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| format!("{};", s))
                    .collect();
                Ok(naive_statements)
            }
        }
    }

    fn record_from_row(&self, row: &PgRow) -> MigratorResult<MigrationRecord> {
        let read = |e: sqlx::Error| MigratorError::Store(format!("Failed to read migration row: {}", e));
        let dependencies: Option<String> = row.try_get("dependencies").map_err(read)?;
        Ok(MigrationRecord {
            id: row.try_get("id").map_err(read)?,
            up_script: row.try_get("up_script").map_err(read)?,
            down_script: row.try_get("down_script").map_err(read)?,
            comment: row.try_get("comment").map_err(read)?,
            dependencies: parse_dependencies(dependencies.as_deref())?,
            created_at: row.try_get("created_at").map_err(read)?,
            is_active: row.try_get("is_active").map_err(read)?,
        })
    }
}

#[async_trait::async_trait]
impl MigrationStore for PostgresStore {
    async fn fetch_all_records(&self) -> MigratorResult<Vec<MigrationRecord>> {
        let sql = self.fetch_all_sql();
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigratorError::Store(format!("Failed to fetch migrations: {}", e)))?;

        rows.iter().map(|row| self.record_from_row(row)).collect()
    }

    async fn execute_migration_unit(
        &self,
        id: MigrationId,
        script: &str,
        desired_active: bool,
    ) -> MigratorResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|e| MigratorError::Store(format!("Failed to start transaction: {}", e)))?;

        if !script.trim().is_empty() {
            for statement in self.split_sql_statements(script)? {
                if !statement.trim().is_empty() {
                    sqlx::query(&statement)
                        .execute(&mut *transaction)
                        .await
                        .map_err(|e| {
                            MigratorError::Store(format!(
                                "Failed to execute migration {}: {}",
                                id, e
                            ))
                        })?;
                }
            }
        }

        let sql = self.set_active_sql();
        let result = sqlx::query(&sql)
            .bind(desired_active)
            .bind(id)
            .execute(&mut *transaction)
            .await
            .map_err(|e| {
                MigratorError::Store(format!("Failed to update migration {} state: {}", id, e))
            })?;
        // dropping the transaction rolls the script statements back
        if result.rows_affected() == 0 {
            return Err(MigratorError::UnknownMigration { id });
        }

        transaction
            .commit()
            .await
            .map_err(|e| MigratorError::Store(format!("Failed to commit migration {}: {}", id, e)))?;

        tracing::debug!("Committed migration unit {} (active = {})", id, desired_active);
        Ok(())
    }

    async fn insert_record(&self, migration: NewMigration) -> MigratorResult<MigrationId> {
        let dependencies = encode_dependencies(&migration.dependencies);
        let sql = self.insert_sql();
        let row = sqlx::query(&sql)
            .bind(&migration.up_script)
            .bind(&migration.down_script)
            .bind(&migration.comment)
            .bind(dependencies)
            .bind(migration.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MigratorError::Store(format!("Failed to insert migration: {}", e)))?;

        let id: MigrationId = row
            .try_get("id")
            .map_err(|e| MigratorError::Store(format!("Failed to read inserted id: {}", e)))?;
        tracing::info!("Registered migration {}", id);
        Ok(id)
    }

    async fn is_initialized(&self) -> MigratorResult<bool> {
        let sql = self.table_exists_sql();
        let row = sqlx::query(&sql)
            .bind(&self.config.table_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MigratorError::Store(format!("Failed to check service table: {}", e)))?;

        row.try_get(0)
            .map_err(|e| MigratorError::Store(format!("Failed to read table check: {}", e)))
    }

    async fn initialize(&self) -> MigratorResult<()> {
        let sql = self.create_table_sql();
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| MigratorError::Store(format!("Failed to create service table: {}", e)))?;
        tracing::info!("Created service table {}", self.config.table_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_sql_only(table: &str) -> PostgresStore {
        // connect_lazy never opens a connection but does spawn pool
        // maintenance tasks, so callers need a running tokio runtime
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/unused");
        PostgresStore::new(
            pool.unwrap(),
            MigratorConfig {
                table_name: table.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn create_table_sql_has_expected_columns() {
        let sql = store_sql_only("migrations").create_table_sql();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS migrations"));
        assert!(sql.contains("id BIGSERIAL PRIMARY KEY"));
        assert!(sql.contains("dependencies TEXT"));
        assert!(sql.contains("is_active BOOLEAN NOT NULL DEFAULT FALSE"));
    }

    #[tokio::test]
    async fn sql_builders_respect_table_override() {
        let store = store_sql_only("schema_history");
        assert!(store.fetch_all_sql().contains("FROM schema_history"));
        assert!(store.insert_sql().contains("INSERT INTO schema_history"));
        assert!(store.set_active_sql().starts_with("UPDATE schema_history"));
    }

    #[tokio::test]
    async fn fetch_all_sql_orders_by_id() {
        let sql = store_sql_only("migrations").fetch_all_sql();
        assert!(sql.ends_with("ORDER BY id"));
    }

    #[tokio::test]
    async fn table_exists_sql_scopes_to_current_schema() {
        let sql = store_sql_only("migrations").table_exists_sql();
        assert!(sql.contains("table_name = $1"));
        assert!(sql.contains("table_schema = current_schema()"));
    }

    #[tokio::test]
    async fn insert_sql_returns_assigned_id() {
        let sql = store_sql_only("migrations").insert_sql();
        assert!(sql.contains("RETURNING id"));
        assert!(sql.contains("VALUES ($1, $2, $3, $4, $5, FALSE)"));
    }

    #[tokio::test]
    async fn split_separates_statements() {
        let store = store_sql_only("migrations");
        let statements = store
            .split_sql_statements(
                "CREATE TABLE users (id BIGINT); CREATE INDEX users_id ON users (id);",
            )
            .unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("CREATE TABLE"));
        assert!(statements.iter().all(|s| s.ends_with(';')));
    }

    #[tokio::test]
    async fn split_falls_back_on_unparseable_sql() {
        let store = store_sql_only("migrations");
        let statements = store
            .split_sql_statements("NOT REAL SQL; ALSO NOT SQL")
            .unwrap();
        assert_eq!(
            statements,
            vec!["NOT REAL SQL;".to_string(), "ALSO NOT SQL;".to_string()]
        );
    }
}
