//! Migration service
//!
//! Owns the injected store handle and drives the plan/execute cycle. All
//! persistence goes through the one [`MigrationStore`] the service was
//! constructed with.

use std::time::Instant;

use crate::definitions::{Direction, ExecutionReport, MigrationId, MigrationRecord, NewMigration};
use crate::error::{MigratorError, MigratorResult};
use crate::plan::{ActionPlan, MigrationSet};
use crate::store::MigrationStore;

/// Coordinates planning and execution of migrations.
pub struct Migrator<S> {
    store: S,
}

impl<S: MigrationStore> Migrator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The injected store handle
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Take a snapshot of all stored records. Planning runs against this
    /// snapshot; nothing re-reads the store until execution.
    pub async fn snapshot(&self) -> MigratorResult<MigrationSet> {
        Ok(MigrationSet::new(self.store.fetch_all_records().await?))
    }

    /// Plan the apply of `target` against a fresh snapshot
    pub async fn plan_apply(&self, target: MigrationId) -> MigratorResult<ActionPlan> {
        self.snapshot().await?.plan_apply(target)
    }

    /// Plan the rollback of `target` against a fresh snapshot
    pub async fn plan_rollback(&self, target: MigrationId) -> MigratorResult<ActionPlan> {
        self.snapshot().await?.plan_rollback(target)
    }

    /// Execute a plan computed from `set`, strictly in plan order.
    ///
    /// Every migration runs as its own atomic unit. When one fails, the
    /// remaining units are not attempted; already committed units stay
    /// committed and are reported in the error.
    pub async fn execute(
        &self,
        set: &MigrationSet,
        plan: &ActionPlan,
    ) -> MigratorResult<ExecutionReport> {
        let start_time = Instant::now();
        let desired_active = plan.direction == Direction::Up;
        let mut completed: Vec<MigrationId> = Vec::new();

        for &id in &plan.migrations {
            let record = set.get(id).ok_or(MigratorError::UnknownMigration { id })?;
            let script = match plan.direction {
                Direction::Up => &record.up_script,
                Direction::Down => &record.down_script,
            };

            tracing::info!(
                "Executing migration {} ({}): {}",
                id,
                plan.direction.as_str(),
                record.comment
            );
            match self
                .store
                .execute_migration_unit(id, script, desired_active)
                .await
            {
                Ok(()) => completed.push(id),
                Err(e) => {
                    tracing::error!(
                        "Migration {} failed, {} earlier unit(s) stay committed: {}",
                        id,
                        completed.len(),
                        e
                    );
                    return Err(MigratorError::Execution {
                        id,
                        completed,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(ExecutionReport {
            direction: plan.direction,
            executed: completed,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Plan and execute the apply of `target`
    pub async fn apply(&self, target: MigrationId) -> MigratorResult<ExecutionReport> {
        let set = self.snapshot().await?;
        let plan = set.plan_apply(target)?;
        self.execute(&set, &plan).await
    }

    /// Plan and execute the rollback of `target`
    pub async fn rollback(&self, target: MigrationId) -> MigratorResult<ExecutionReport> {
        let set = self.snapshot().await?;
        let plan = set.plan_rollback(target)?;
        self.execute(&set, &plan).await
    }

    /// Stored records ascending by id. `include_inactive` controls whether
    /// pending migrations are listed alongside applied ones.
    pub async fn list(&self, include_inactive: bool) -> MigratorResult<Vec<MigrationRecord>> {
        let set = self.snapshot().await?;
        Ok(set
            .records()
            .filter(|record| include_inactive || record.is_active)
            .cloned()
            .collect())
    }

    /// Register a new migration and return its assigned id
    pub async fn add(&self, migration: NewMigration) -> MigratorResult<MigrationId> {
        self.store.insert_record(migration).await
    }
}
