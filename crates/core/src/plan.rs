//! Action planning
//!
//! Turns a record snapshot into the ordered list of migrations an apply or
//! rollback has to execute. Planning is pure; execution lives in the
//! migrator service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::definitions::{Direction, MigrationId, MigrationRecord};
use crate::error::MigratorResult;
use crate::graph::DependencyGraph;

/// Ordered list of migrations to execute in one direction.
///
/// Apply plans list dependencies before their dependents and contain only
/// inactive migrations; rollback plans list dependents before the target
/// and contain only active ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlan {
    /// Direction the plan executes in
    pub direction: Direction,
    /// Migration ids in execution order
    pub migrations: Vec<MigrationId>,
}

impl ActionPlan {
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// One-line human-readable summary
    pub fn describe(&self) -> String {
        let verb = match self.direction {
            Direction::Up => "apply",
            Direction::Down => "roll back",
        };
        if self.migrations.is_empty() {
            return format!("nothing to {}", verb);
        }
        let order = self
            .migrations
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        format!("{} {} migration(s): {}", verb, self.migrations.len(), order)
    }
}

/// Snapshot of all stored migration records, keyed by id.
///
/// Everything planning needs is computed from this snapshot; no store
/// access happens after it is taken.
#[derive(Debug, Clone, Default)]
pub struct MigrationSet {
    records: BTreeMap<MigrationId, MigrationRecord>,
}

impl MigrationSet {
    pub fn new(records: Vec<MigrationRecord>) -> Self {
        let records = records.into_iter().map(|r| (r.id, r)).collect();
        Self { records }
    }

    /// Build the forward dependency graph over the snapshot
    pub fn graph(&self) -> MigratorResult<DependencyGraph> {
        let records: Vec<MigrationRecord> = self.records.values().cloned().collect();
        DependencyGraph::build(&records)
    }

    /// Plan the apply of `target`: every inactive migration it transitively
    /// depends on, dependencies first, target last.
    pub fn plan_apply(&self, target: MigrationId) -> MigratorResult<ActionPlan> {
        let graph = self.graph()?;
        let sub = graph.subgraph(target)?;
        let mut order = sub.topological_sort()?;
        order.reverse();

        let migrations: Vec<MigrationId> = order
            .into_iter()
            .filter(|id| sub.node(*id).map_or(false, |node| !node.is_active))
            .collect();

        tracing::debug!(
            "Planned apply of {}: {} of {} reachable migrations pending",
            target,
            migrations.len(),
            sub.len()
        );
        Ok(ActionPlan {
            direction: Direction::Up,
            migrations,
        })
    }

    /// Plan the rollback of `target`: every active migration that
    /// transitively depends on it, dependents first, target last.
    pub fn plan_rollback(&self, target: MigrationId) -> MigratorResult<ActionPlan> {
        let graph = self.graph()?.reversed();
        let sub = graph.subgraph(target)?;
        let mut order = sub.topological_sort()?;
        order.reverse();

        let migrations: Vec<MigrationId> = order
            .into_iter()
            .filter(|id| sub.node(*id).map_or(false, |node| node.is_active))
            .collect();

        tracing::debug!(
            "Planned rollback of {}: {} of {} dependent migrations active",
            target,
            migrations.len(),
            sub.len()
        );
        Ok(ActionPlan {
            direction: Direction::Down,
            migrations,
        })
    }

    /// Look up a record by id
    pub fn get(&self, id: MigrationId) -> Option<&MigrationRecord> {
        self.records.get(&id)
    }

    /// All records, ascending by id
    pub fn records(&self) -> impl Iterator<Item = &MigrationRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigratorError;
    use chrono::Utc;

    fn record(id: MigrationId, dependencies: &[MigrationId], is_active: bool) -> MigrationRecord {
        MigrationRecord {
            id,
            up_script: format!("CREATE TABLE t{} (id BIGINT);", id),
            down_script: format!("DROP TABLE t{};", id),
            comment: format!("migration {}", id),
            dependencies: if dependencies.is_empty() {
                None
            } else {
                Some(dependencies.iter().copied().collect())
            },
            created_at: Utc::now(),
            is_active,
        }
    }

    fn chain(active: [bool; 3]) -> MigrationSet {
        MigrationSet::new(vec![
            record(1, &[], active[0]),
            record(2, &[1], active[1]),
            record(3, &[2], active[2]),
        ])
    }

    #[test]
    fn apply_orders_chain_dependencies_first() {
        let plan = chain([false, false, false]).plan_apply(3).unwrap();
        assert_eq!(plan.direction, Direction::Up);
        assert_eq!(plan.migrations, vec![1, 2, 3]);
    }

    #[test]
    fn apply_skips_already_active_dependencies() {
        let plan = chain([true, false, false]).plan_apply(3).unwrap();
        assert_eq!(plan.migrations, vec![2, 3]);
    }

    #[test]
    fn apply_of_fully_active_chain_is_empty() {
        let plan = chain([true, true, true]).plan_apply(3).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn apply_retains_only_inactive_migrations() {
        let set = MigrationSet::new(vec![
            record(1, &[], true),
            record(2, &[1], false),
            record(3, &[1], true),
            record(4, &[2, 3], false),
        ]);
        let plan = set.plan_apply(4).unwrap();
        assert_eq!(plan.migrations, vec![2, 4]);
    }

    #[test]
    fn apply_breaks_branch_ties_toward_smaller_ids() {
        let set = MigrationSet::new(vec![
            record(1, &[], false),
            record(2, &[], false),
            record(3, &[1, 2], false),
        ]);
        let plan = set.plan_apply(3).unwrap();
        assert_eq!(plan.migrations, vec![1, 2, 3]);
    }

    #[test]
    fn rollback_orders_dependents_first() {
        let plan = chain([true, true, true]).plan_rollback(1).unwrap();
        assert_eq!(plan.direction, Direction::Down);
        assert_eq!(plan.migrations, vec![3, 2, 1]);
    }

    #[test]
    fn rollback_retains_only_active_migrations() {
        let plan = chain([true, true, false]).plan_rollback(1).unwrap();
        assert_eq!(plan.migrations, vec![2, 1]);
    }

    #[test]
    fn rollback_of_inactive_set_is_empty() {
        let plan = chain([false, false, false]).plan_rollback(1).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn rollback_ignores_unrelated_migrations() {
        let set = MigrationSet::new(vec![
            record(1, &[], true),
            record(2, &[1], true),
            record(3, &[], true),
        ]);
        let plan = set.plan_rollback(1).unwrap();
        assert_eq!(plan.migrations, vec![2, 1]);
    }

    #[test]
    fn planning_unknown_target_fails() {
        let err = chain([false, false, false]).plan_apply(9).unwrap_err();
        assert!(matches!(err, MigratorError::UnknownMigration { id: 9 }));
    }

    #[test]
    fn dangling_dependency_fails_before_traversal() {
        let set = MigrationSet::new(vec![record(1, &[], false), record(2, &[5], false)]);
        // 1 is reachable without touching 2, but the integrity check runs
        // at build time
        let err = set.plan_apply(1).unwrap_err();
        assert!(matches!(
            err,
            MigratorError::MalformedDependency {
                migration: 2,
                dependency: 5
            }
        ));
    }

    #[test]
    fn describe_summarizes_plans() {
        let plan = chain([false, false, false]).plan_apply(3).unwrap();
        assert_eq!(plan.describe(), "apply 3 migration(s): 1 -> 2 -> 3");

        let empty = chain([true, true, true]).plan_apply(3).unwrap();
        assert_eq!(empty.describe(), "nothing to apply");
    }
}
