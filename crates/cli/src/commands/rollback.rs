use migrator_core::{MigrationId, Migrator, MigratorResult, PostgresStore};

use super::plan::print_plan;
use crate::interactive::Prompt;

/// Roll back `id` and every active migration that depends on it, dependents
/// first, after showing the plan and confirming.
pub async fn run(
    migrator: &Migrator<PostgresStore>,
    id: MigrationId,
    yes: bool,
) -> MigratorResult<()> {
    let set = migrator.snapshot().await?;
    let plan = set.plan_rollback(id)?;
    print_plan(&set, &plan);
    if plan.is_empty() {
        return Ok(());
    }

    if !yes {
        let message = format!("Roll back {} migration(s)?", plan.len());
        if !Prompt::confirm(&message, false)? {
            println!("Aborted. No changes were made.");
            return Ok(());
        }
    }

    let report = migrator.execute(&set, &plan).await?;
    println!(
        "✅ Rolled back {} migration(s) in {}ms",
        report.count(),
        report.execution_time_ms
    );
    Ok(())
}
