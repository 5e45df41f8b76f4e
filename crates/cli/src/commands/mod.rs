pub mod migrate;

use anyhow::Context as _;
use std::env;
use std::path::Path;
use std::sync::Arc;
use strata_core::{ConfigLookup, ConfigRepository, Environment};
use strata_orm::{DatabaseFacade, DatabaseFactory, MigrationConfig};
use tracing::{debug, warn};

/// Overrides the URL of the selected connection
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Everything a command needs: configuration and the connection to use
pub struct Context {
    config: Arc<ConfigRepository>,
    connection: String,
}

impl Context {
    /// Load configuration from `dir` for `environment` (or `STRATA_ENV`)
    pub fn load(dir: &Path, environment: Option<&str>, connection: Option<&str>) -> anyhow::Result<Self> {
        let environment = match environment {
            Some(name) => name.parse::<Environment>()?,
            None => Environment::from_env()?,
        };

        let mut config = if dir.is_dir() {
            ConfigRepository::load(dir, environment)
                .with_context(|| format!("loading configuration from {}", dir.display()))?
        } else {
            warn!("configuration directory {} not found; using defaults", dir.display());
            ConfigRepository::new()
        };

        let connection = connection
            .map(str::to_string)
            .unwrap_or_else(|| config.get_str_or("database.default", "default"));

        if let Ok(url) = env::var(DATABASE_URL_VAR) {
            debug!("{} overrides connection '{}'", DATABASE_URL_VAR, connection);
            config.set(&format!("database.connections.{}.url", connection), url);
        }

        Ok(Self {
            config: Arc::new(config),
            connection,
        })
    }

    pub fn config(&self) -> &ConfigRepository {
        &self.config
    }

    /// Name of the selected connection
    pub fn connection_name(&self) -> &str {
        &self.connection
    }

    pub fn migration_config(&self) -> anyhow::Result<MigrationConfig> {
        Ok(MigrationConfig::from_config(self.config.as_ref())?)
    }

    /// Open the selected connection
    pub async fn database(&self) -> anyhow::Result<Arc<dyn DatabaseFacade>> {
        let factory = DatabaseFactory::new(self.config.clone());
        let db = factory
            .connection(Some(&self.connection))
            .await
            .with_context(|| format!("opening connection '{}'", self.connection))?;
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_database_url_overrides_selected_connection() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("database.yaml"),
            "default: main\nconnections:\n  main:\n    url: sqlite://app.db\n",
        )
        .unwrap();

        env::set_var(DATABASE_URL_VAR, "sqlite::memory:");
        let context = Context::load(dir.path(), Some("testing"), None).unwrap();
        env::remove_var(DATABASE_URL_VAR);

        assert_eq!(context.connection_name(), "main");
        assert_eq!(
            context.config().get_str("database.connections.main.url").as_deref(),
            Some("sqlite::memory:")
        );
    }

    #[test]
    #[serial]
    fn test_missing_config_directory_uses_defaults() {
        env::remove_var(DATABASE_URL_VAR);
        let context = Context::load(Path::new("/no/such/config"), Some("dev"), Some("reporting")).unwrap();
        assert_eq!(context.connection_name(), "reporting");

        let migration = context.migration_config().unwrap();
        assert_eq!(migration.migrations_table, "migrations");
    }

    #[test]
    #[serial]
    fn test_unknown_environment_is_rejected() {
        assert!(Context::load(Path::new("/no/such/config"), Some("staging"), None).is_err());
    }
}
