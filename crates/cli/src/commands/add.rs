use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use migrator_core::{
    MigrationId, Migrator, MigratorError, MigratorResult, NewMigration, PostgresStore,
};

use crate::interactive::Prompt;

/// Register a new migration from script files.
///
/// Dependencies must name existing migrations; registering without any is
/// confirmed interactively because root migrations are usually a one-time
/// event.
pub async fn run(
    migrator: &Migrator<PostgresStore>,
    up_path: &Path,
    down_path: &Path,
    message: &str,
    dependencies: &[MigrationId],
    yes: bool,
) -> MigratorResult<()> {
    let (up_script, down_script) = read_scripts(up_path, down_path)?;

    let dependencies: BTreeSet<MigrationId> = dependencies.iter().copied().collect();
    if dependencies.is_empty() && !yes {
        let register =
            Prompt::confirm("No dependencies given. Register as a root migration?", false)?;
        if !register {
            println!("Aborted. No changes were made.");
            return Ok(());
        }
    }

    // a dangling reference would poison every future plan
    let set = migrator.snapshot().await?;
    for dependency in &dependencies {
        if set.get(*dependency).is_none() {
            return Err(MigratorError::UnknownMigration { id: *dependency });
        }
    }

    let id = migrator
        .add(NewMigration::new(
            up_script,
            down_script,
            message.to_string(),
            if dependencies.is_empty() {
                None
            } else {
                Some(dependencies)
            },
        ))
        .await?;

    println!("✅ Registered migration {} ({})", id, message);
    Ok(())
}

/// Read the up and down scripts from disk
fn read_scripts(up_path: &Path, down_path: &Path) -> MigratorResult<(String, String)> {
    let up_script = fs::read_to_string(up_path)?;
    let down_script = fs::read_to_string(down_path)?;
    Ok((up_script, down_script))
}
