//! Persistence collaborators
//!
//! The graph engine never talks to a database directly; everything durable
//! goes through the [`MigrationStore`] trait. [`PostgresStore`] is the
//! production implementation, [`MemoryStore`] backs tests and embedding.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::definitions::{MigrationId, MigrationRecord, NewMigration};
use crate::error::MigratorResult;

/// Persistence seam for migration records and script execution.
///
/// Implementations guarantee that `execute_migration_unit` is atomic: the
/// script statements and the active-flag update commit together or not at
/// all. The engine relies on that to leave well-defined partial progress
/// behind when a plan fails mid-way.
#[async_trait::async_trait]
pub trait MigrationStore: Send + Sync {
    /// Fetch every stored migration record
    async fn fetch_all_records(&self) -> MigratorResult<Vec<MigrationRecord>>;

    /// Run one migration unit: execute `script` and set the record's
    /// active flag to `desired_active`, atomically.
    async fn execute_migration_unit(
        &self,
        id: MigrationId,
        script: &str,
        desired_active: bool,
    ) -> MigratorResult<()>;

    /// Insert a new record and return its store-assigned id
    async fn insert_record(&self, migration: NewMigration) -> MigratorResult<MigrationId>;

    /// Whether the service table exists
    async fn is_initialized(&self) -> MigratorResult<bool>;

    /// Create the service table
    async fn initialize(&self) -> MigratorResult<()>;
}
