//! Migration definitions - core types shared across the migration system
//!
//! Defines the record and configuration structures the graph engine, the
//! stores, and the CLI all operate on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{MigratorError, MigratorResult};

/// Identifier assigned to a migration by the store on insert. Never reused.
pub type MigrationId = i64;

/// A stored migration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Store-assigned identifier
    pub id: MigrationId,
    /// SQL statements applying the schema change
    pub up_script: String,
    /// SQL statements reversing the schema change
    pub down_script: String,
    /// Human-readable description
    pub comment: String,
    /// Ids this migration depends on. `None` means the migration never
    /// declared dependencies; it is never encoded as an empty set.
    pub dependencies: Option<BTreeSet<MigrationId>>,
    /// When the record was inserted
    pub created_at: DateTime<Utc>,
    /// Whether the migration is currently applied
    pub is_active: bool,
}

/// Insert-side view of a migration. The store assigns `id` and the initial
/// inactive state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMigration {
    /// SQL statements applying the schema change
    pub up_script: String,
    /// SQL statements reversing the schema change
    pub down_script: String,
    /// Human-readable description
    pub comment: String,
    /// Ids this migration depends on, if any
    pub dependencies: Option<BTreeSet<MigrationId>>,
    /// When the migration was registered
    pub created_at: DateTime<Utc>,
}

impl NewMigration {
    /// Build an insert request stamped with the current time.
    pub fn new(
        up_script: String,
        down_script: String,
        comment: String,
        dependencies: Option<BTreeSet<MigrationId>>,
    ) -> Self {
        Self {
            up_script,
            down_script,
            comment,
            dependencies,
            created_at: Utc::now(),
        }
    }
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Table name holding migration records
    pub table_name: String,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            table_name: "migrations".to_string(),
        }
    }
}

/// Direction a plan executes in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Apply migrations (run up scripts, activate)
    Up,
    /// Roll back migrations (run down scripts, deactivate)
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// Result of executing a plan
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Direction the plan ran in
    pub direction: Direction,
    /// Ids of migrations that were executed, in execution order
    pub executed: Vec<MigrationId>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl ExecutionReport {
    pub fn count(&self) -> usize {
        self.executed.len()
    }
}

/// Encode a dependency set for the store's textual column.
///
/// `None` (and an empty set, which normalizes to the same marker) maps to
/// SQL NULL; a non-empty set maps to a bracketed integer list.
pub fn encode_dependencies(dependencies: &Option<BTreeSet<MigrationId>>) -> Option<String> {
    match dependencies {
        Some(deps) if !deps.is_empty() => {
            let ids: Vec<MigrationId> = deps.iter().copied().collect();
            // Vec<i64> to JSON cannot fail
            Some(serde_json::to_string(&ids).unwrap_or_default())
        }
        _ => None,
    }
}

/// Parse the store's textual dependency column back into a set.
///
/// Accepts NULL, an empty list, or a bracketed integer list; whitespace
/// between elements is tolerated so rows written as `[1, 2]` parse the
/// same as `[1,2]`. Anything else is a store-integrity error.
pub fn parse_dependencies(text: Option<&str>) -> MigratorResult<Option<BTreeSet<MigrationId>>> {
    let text = match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Ok(None),
    };

    let ids: Vec<MigrationId> = serde_json::from_str(text)
        .map_err(|e| MigratorError::Store(format!("invalid dependency list '{}': {}", text, e)))?;

    if ids.is_empty() {
        return Ok(None);
    }
    Ok(Some(ids.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_none_is_null() {
        assert_eq!(encode_dependencies(&None), None);
    }

    #[test]
    fn encode_empty_set_normalizes_to_null() {
        assert_eq!(encode_dependencies(&Some(BTreeSet::new())), None);
    }

    #[test]
    fn encode_set_is_sorted_list() {
        let deps: BTreeSet<MigrationId> = [3, 1, 2].into_iter().collect();
        assert_eq!(encode_dependencies(&Some(deps)), Some("[1,2,3]".to_string()));
    }

    #[test]
    fn parse_null_and_empty_are_no_dependency() {
        assert_eq!(parse_dependencies(None).unwrap(), None);
        assert_eq!(parse_dependencies(Some("")).unwrap(), None);
        assert_eq!(parse_dependencies(Some("  ")).unwrap(), None);
        assert_eq!(parse_dependencies(Some("[]")).unwrap(), None);
    }

    #[test]
    fn parse_accepts_spaced_lists() {
        let expected: BTreeSet<MigrationId> = [1, 2].into_iter().collect();
        assert_eq!(parse_dependencies(Some("[1, 2]")).unwrap(), Some(expected.clone()));
        assert_eq!(parse_dependencies(Some("[1,2]")).unwrap(), Some(expected));
    }

    #[test]
    fn parse_collapses_duplicates() {
        let expected: BTreeSet<MigrationId> = [1, 2].into_iter().collect();
        assert_eq!(parse_dependencies(Some("[1, 2, 1]")).unwrap(), Some(expected));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_dependencies(Some("not a list")).is_err());
        assert!(parse_dependencies(Some("[1, \"two\"]")).is_err());
    }

    #[test]
    fn codec_round_trips() {
        let deps: Option<BTreeSet<MigrationId>> = Some([7, 11].into_iter().collect());
        let encoded = encode_dependencies(&deps);
        assert_eq!(parse_dependencies(encoded.as_deref()).unwrap(), deps);
    }
}
