use anyhow::Context as _;
use strata_orm::{
    MigrationAction, MigrationManager, MigrationRegistry, MigrationRunResult, MigrationRunner,
    RecordingMode, UnitStatus,
};

use super::Context;

async fn runner(ctx: &Context, batch: bool) -> anyhow::Result<MigrationRunner> {
    let config = ctx.migration_config()?;
    let db = ctx.database().await?;
    let registry = MigrationRegistry::new(&config.migrations_dir);
    let mut runner = MigrationRunner::new(db, registry, &config);
    if batch {
        runner = runner.with_recording(RecordingMode::Batch);
    }
    Ok(runner)
}

/// Run `action` over every pending migration
pub async fn run(ctx: &Context, action: MigrationAction, batch: bool) -> anyhow::Result<MigrationRunResult> {
    let runner = runner(ctx, batch).await?;
    let result = runner
        .run(action)
        .await
        .with_context(|| format!("{} run aborted", action))?;
    Ok(result)
}

/// Print which actions are recorded for each migration
pub async fn status(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let runner = runner(ctx, false).await?;
    let statuses = runner.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("Migration Status ({}):", runner.store().table());
    println!("================");
    if statuses.is_empty() {
        println!("No migrations found");
    }
    for status in &statuses {
        println!("  {:<8} {}", status_label(status), status.migration);
    }
    Ok(())
}

/// Write a new SQL migration template
pub fn create(ctx: &Context, name: &str) -> anyhow::Result<String> {
    let config = ctx.migration_config()?;
    let manager = MigrationManager::with_config(config);
    let filename = manager.create_migration(name)?;
    println!(
        "Created migration: {}",
        manager.config().migrations_dir.join(&filename).display()
    );
    Ok(filename)
}

fn status_label(status: &UnitStatus) -> String {
    if status.recorded.is_empty() {
        return "pending".to_string();
    }
    status
        .recorded
        .iter()
        .map(MigrationAction::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn context(root: &Path) -> Context {
        let config_dir = root.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("database.yaml"),
            "connections:\n  default:\n    url: 'sqlite::memory:'\n",
        )
        .unwrap();
        fs::write(
            config_dir.join("path.yaml"),
            format!("migration: '{}'\n", root.join("migration").display()),
        )
        .unwrap();
        std::env::remove_var(super::super::DATABASE_URL_VAR);
        Context::load(&config_dir, Some("testing"), None).unwrap()
    }

    #[test]
    fn test_status_label() {
        let pending = UnitStatus {
            migration: "a.sql".to_string(),
            recorded: Vec::new(),
        };
        assert_eq!(status_label(&pending), "pending");

        let seeded = UnitStatus {
            migration: "a.sql".to_string(),
            recorded: vec![MigrationAction::Apply, MigrationAction::Seed],
        };
        assert_eq!(status_label(&seeded), "apply,seed");
    }

    #[tokio::test]
    #[serial]
    async fn test_create_then_run_sql_migration() {
        let root = TempDir::new().unwrap();
        let ctx = context(root.path());

        let filename = create(&ctx, "create widgets").unwrap();
        let path = root.path().join("migration").join(&filename);
        let template = fs::read_to_string(&path).unwrap();
        fs::write(
            &path,
            template.replace(
                "-- Up migration\n",
                "-- Up migration\nCREATE TABLE widgets (id INTEGER);\n",
            ),
        )
        .unwrap();

        let result = run(&ctx, MigrationAction::Apply, false).await.unwrap();
        assert_eq!(result.applied, vec![filename]);
    }

    #[tokio::test]
    #[serial]
    async fn test_run_without_directory_is_clean() {
        let root = TempDir::new().unwrap();
        let ctx = context(root.path());
        let result = run(&ctx, MigrationAction::Seed, true).await.unwrap();
        assert!(result.directory_missing);
    }
}
