//! In-memory store
//!
//! Implements [`MigrationStore`] against process memory. Used by the test
//! suite and by embedders that want planning semantics without a database.
//! Executions are journaled as (id, desired state) pairs; script bodies are
//! accepted but never interpreted.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use super::MigrationStore;
use crate::definitions::{MigrationId, MigrationRecord, NewMigration};
use crate::error::{MigratorError, MigratorResult};

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<MigrationId, MigrationRecord>,
    next_id: MigrationId,
    executed: Vec<(MigrationId, bool)>,
    fail_on: BTreeSet<MigrationId>,
    initialized: bool,
}

/// Migration store backed by process memory.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Seed the store with existing records. `next_id` continues after the
    /// highest seeded id.
    pub fn with_records(records: Vec<MigrationRecord>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let records = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            inner: Mutex::new(Inner {
                records,
                next_id,
                executed: Vec::new(),
                fail_on: BTreeSet::new(),
                initialized: true,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make `execute_migration_unit` fail for `id`, leaving the record
    /// untouched. Lets tests exercise mid-plan abort behavior.
    pub fn fail_on(&self, id: MigrationId) {
        self.lock().fail_on.insert(id);
    }

    /// Execution journal: (id, desired active state) in execution order
    pub fn executed(&self) -> Vec<(MigrationId, bool)> {
        self.lock().executed.clone()
    }

    /// Current state of a record
    pub fn record(&self, id: MigrationId) -> Option<MigrationRecord> {
        self.lock().records.get(&id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MigrationStore for MemoryStore {
    async fn fetch_all_records(&self) -> MigratorResult<Vec<MigrationRecord>> {
        Ok(self.lock().records.values().cloned().collect())
    }

    async fn execute_migration_unit(
        &self,
        id: MigrationId,
        _script: &str,
        desired_active: bool,
    ) -> MigratorResult<()> {
        let mut inner = self.lock();
        if inner.fail_on.contains(&id) {
            return Err(MigratorError::Store(format!(
                "injected failure for migration {}",
                id
            )));
        }
        let record = inner
            .records
            .get_mut(&id)
            .ok_or(MigratorError::UnknownMigration { id })?;
        record.is_active = desired_active;
        inner.executed.push((id, desired_active));
        Ok(())
    }

    async fn insert_record(&self, migration: NewMigration) -> MigratorResult<MigrationId> {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        // an empty dependency set means the same as no list at all
        let dependencies = migration.dependencies.filter(|deps| !deps.is_empty());
        inner.records.insert(
            id,
            MigrationRecord {
                id,
                up_script: migration.up_script,
                down_script: migration.down_script,
                comment: migration.comment,
                dependencies,
                created_at: migration.created_at,
                is_active: false,
            },
        );
        Ok(id)
    }

    async fn is_initialized(&self) -> MigratorResult<bool> {
        Ok(self.lock().initialized)
    }

    async fn initialize(&self) -> MigratorResult<()> {
        self.lock().initialized = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_migration(dependencies: Option<&[MigrationId]>) -> NewMigration {
        NewMigration::new(
            "CREATE TABLE users (id BIGINT);".to_string(),
            "DROP TABLE users;".to_string(),
            "create users".to_string(),
            dependencies.map(|deps| deps.iter().copied().collect()),
        )
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        assert_eq!(store.insert_record(new_migration(None)).await.unwrap(), 1);
        assert_eq!(
            store.insert_record(new_migration(Some(&[1]))).await.unwrap(),
            2
        );

        let records = store.fetch_all_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].is_active);
    }

    #[tokio::test]
    async fn insert_normalizes_empty_dependency_set() {
        let store = MemoryStore::new();
        let id = store.insert_record(new_migration(Some(&[]))).await.unwrap();
        assert_eq!(store.record(id).unwrap().dependencies, None);
    }

    #[tokio::test]
    async fn insert_preserves_registration_time() {
        let store = MemoryStore::new();
        let mut migration = new_migration(None);
        // backdate so store-side stamping would be caught
        migration.created_at = migration.created_at - chrono::Duration::days(1);
        let registered_at = migration.created_at;

        let id = store.insert_record(migration).await.unwrap();
        assert_eq!(store.record(id).unwrap().created_at, registered_at);
    }

    #[tokio::test]
    async fn execute_flips_active_state_and_journals() {
        let store = MemoryStore::new();
        let id = store.insert_record(new_migration(None)).await.unwrap();

        store
            .execute_migration_unit(id, "CREATE TABLE users (id BIGINT);", true)
            .await
            .unwrap();
        assert!(store.record(id).unwrap().is_active);
        assert_eq!(store.executed(), vec![(id, true)]);

        store
            .execute_migration_unit(id, "DROP TABLE users;", false)
            .await
            .unwrap();
        assert!(!store.record(id).unwrap().is_active);
        assert_eq!(store.executed(), vec![(id, true), (id, false)]);
    }

    #[tokio::test]
    async fn injected_failure_leaves_record_untouched() {
        let store = MemoryStore::new();
        let id = store.insert_record(new_migration(None)).await.unwrap();
        store.fail_on(id);

        let err = store
            .execute_migration_unit(id, "CREATE TABLE users (id BIGINT);", true)
            .await
            .unwrap_err();
        assert!(matches!(err, MigratorError::Store(_)));
        assert!(!store.record(id).unwrap().is_active);
        assert!(store.executed().is_empty());
    }
}
