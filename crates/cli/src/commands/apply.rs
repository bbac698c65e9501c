use migrator_core::{MigrationId, Migrator, MigratorResult, PostgresStore};

use super::plan::print_plan;
use crate::interactive::Prompt;

/// Apply `id` and every inactive migration it depends on, in dependency
/// order, after showing the plan and confirming.
pub async fn run(
    migrator: &Migrator<PostgresStore>,
    id: MigrationId,
    yes: bool,
) -> MigratorResult<()> {
    let set = migrator.snapshot().await?;
    let plan = set.plan_apply(id)?;
    print_plan(&set, &plan);
    if plan.is_empty() {
        return Ok(());
    }

    if !yes {
        let message = format!("Apply {} migration(s)?", plan.len());
        if !Prompt::confirm(&message, false)? {
            println!("Aborted. No changes were made.");
            return Ok(());
        }
    }

    let report = migrator.execute(&set, &plan).await?;
    println!(
        "✅ Applied {} migration(s) in {}ms",
        report.count(),
        report.execution_time_ms
    );
    Ok(())
}
