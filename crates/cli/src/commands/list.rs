use migrator_core::{Migrator, MigratorResult, PostgresStore};

/// Print stored migrations. Active ones only by default, everything with
/// `all`.
pub async fn run(migrator: &Migrator<PostgresStore>, all: bool) -> MigratorResult<()> {
    let records = migrator.list(all).await?;

    if records.is_empty() {
        if all {
            println!("No migrations registered.");
        } else {
            println!("No active migrations. Use --all to include pending ones.");
        }
        return Ok(());
    }

    println!("Migrations");
    println!("==========");
    for record in &records {
        let marker = if record.is_active { "✅" } else { "🔄" };
        let dependencies = match &record.dependencies {
            Some(deps) => format!(
                "[{}]",
                deps.iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            None => "-".to_string(),
        };
        println!(
            "{} {:>4}  {}  deps: {:<12} {}",
            marker,
            record.id,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            dependencies,
            record.comment
        );
    }
    println!();
    println!("{} migration(s)", records.len());
    Ok(())
}
