use migrator_core::{ActionPlan, Direction, MigrationId, MigrationSet, Migrator, MigratorResult, PostgresStore};

/// Print the execution plan for a target without running anything.
pub async fn run(
    migrator: &Migrator<PostgresStore>,
    id: MigrationId,
    rollback: bool,
) -> MigratorResult<()> {
    let set = migrator.snapshot().await?;
    let plan = if rollback {
        set.plan_rollback(id)?
    } else {
        set.plan_apply(id)?
    };
    print_plan(&set, &plan);
    Ok(())
}

/// Shared plan rendering for the plan/apply/rollback commands
pub(crate) fn print_plan(set: &MigrationSet, plan: &ActionPlan) {
    if plan.is_empty() {
        println!("✅ {}", plan.describe());
        return;
    }

    let title = match plan.direction {
        Direction::Up => "Apply plan",
        Direction::Down => "Rollback plan",
    };
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));
    for (step, id) in plan.migrations.iter().enumerate() {
        let comment = set.get(*id).map(|r| r.comment.as_str()).unwrap_or("");
        println!("{:>3}. migration {:<6} {}", step + 1, id, comment);
    }
    println!();
    println!("{}", plan.describe());
}
