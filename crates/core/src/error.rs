use thiserror::Error;

use crate::definitions::MigrationId;

/// Errors produced while building graphs, planning, or executing migrations.
#[derive(Debug, Error)]
pub enum MigratorError {
    /// A stored record references a dependency id that does not exist.
    /// Surfaced while building the graph, before any traversal runs.
    #[error("migration {migration} depends on {dependency}, but {dependency} was not found")]
    MalformedDependency {
        migration: MigrationId,
        dependency: MigrationId,
    },

    /// The dependency relation contains a cycle. `path` holds the ids of
    /// the offending chain joined with " -> ".
    #[error("circular dependency detected: {path}")]
    CyclicDependency { path: String },

    /// The requested target id is not present in the stored record set.
    #[error("unknown migration: {id}")]
    UnknownMigration { id: MigrationId },

    /// A migration unit failed mid-plan. Units listed in `completed` were
    /// each committed in their own transaction and stay applied; units
    /// after `id` were never started.
    #[error("migration {id} failed during execution (completed: {completed:?}): {source}")]
    Execution {
        id: MigrationId,
        completed: Vec<MigrationId>,
        #[source]
        source: Box<MigratorError>,
    },

    /// Failure reported by the persistence collaborator.
    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MigratorResult<T> = Result<T, MigratorError>;
