//! # migrator-core: Dependency-aware schema migration engine
//!
//! Manages ordered, reversible schema migrations for PostgreSQL. Stored
//! records form a dependency graph; applying a migration first applies
//! everything it depends on, rolling one back first rolls back everything
//! that depends on it.
//!
//! Planning is pure and runs against a snapshot of the stored records;
//! execution commits one transactional unit per migration, in plan order,
//! through an injected [`store::MigrationStore`] handle.

pub mod definitions;
pub mod error;
pub mod graph;
pub mod migrator;
pub mod plan;
pub mod store;

// Re-export core types
pub use definitions::{
    Direction, ExecutionReport, MigrationId, MigrationRecord, MigratorConfig, NewMigration,
};
pub use error::{MigratorError, MigratorResult};
pub use graph::{DependencyGraph, GraphNode};
pub use migrator::Migrator;
pub use plan::{ActionPlan, MigrationSet};
pub use store::{MemoryStore, MigrationStore, PostgresStore};
