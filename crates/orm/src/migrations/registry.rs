//! Migration Registry - discovers units and resolves them to implementations
//!
//! Units are files in the migrations directory, ordered by file name. A file
//! resolves through the factory registered under its stem; `.sql` files
//! without a factory are loaded as SQL-file units.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use super::definitions::MigrationConfig;
use super::manager::MigrationManager;
use super::unit::MigrationUnit;
use crate::backends::SqlDialect;
use crate::error::{OrmError, OrmResult};

/// Builds a fresh unit for every run
pub type UnitFactory = Arc<dyn Fn() -> Box<dyn MigrationUnit> + Send + Sync>;

/// A discovered migration file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MigrationDescriptor {
    /// File name; this is what the tracking table stores
    pub name: String,
    /// File name without extension; the factory key
    pub key: String,
    pub path: PathBuf,
}

impl MigrationDescriptor {
    fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let key = path.file_stem()?.to_str()?.to_string();
        Some(Self { name, key, path })
    }

    fn is_sql(&self) -> bool {
        self.path.extension().map_or(false, |ext| ext == "sql")
    }
}

pub struct MigrationRegistry {
    directory: PathBuf,
    factories: HashMap<String, UnitFactory>,
}

impl MigrationRegistry {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            factories: HashMap::new(),
        }
    }

    /// Register the constructor for the unit stored as `<key>.<ext>`
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn MigrationUnit> + Send + Sync + 'static,
    {
        self.factories.insert(key.into(), Arc::new(factory));
        self
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// Every unit file in the directory, sorted by name
    pub fn discover(&self) -> OrmResult<Vec<MigrationDescriptor>> {
        let entries = fs::read_dir(&self.directory).map_err(|e| {
            OrmError::Migration(format!(
                "Failed to read migrations directory {}: {}",
                self.directory.display(),
                e
            ))
        })?;

        let mut units = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| OrmError::Migration(format!("Failed to read directory entry: {}", e)))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(descriptor) = MigrationDescriptor::from_path(path) else {
                continue;
            };
            if descriptor.name.starts_with('.') {
                continue;
            }
            units.push(descriptor);
        }

        units.sort();
        Ok(units)
    }

    /// Discovered units not contained in `applied`, in discovery order
    pub fn pending(&self, applied: &BTreeSet<String>) -> OrmResult<Vec<MigrationDescriptor>> {
        Ok(self
            .discover()?
            .into_iter()
            .filter(|unit| !applied.contains(&unit.name))
            .collect())
    }

    /// Build the unit behind `descriptor`
    pub fn instantiate(
        &self,
        descriptor: &MigrationDescriptor,
        dialect: SqlDialect,
    ) -> OrmResult<Box<dyn MigrationUnit>> {
        if let Some(factory) = self.factories.get(&descriptor.key) {
            return Ok(factory());
        }
        if descriptor.is_sql() {
            let manager = MigrationManager::with_config(MigrationConfig {
                migrations_dir: self.directory.clone(),
                ..MigrationConfig::default()
            });
            let unit = manager.load_sql_unit(&descriptor.path, dialect)?;
            return Ok(Box::new(unit));
        }
        Err(OrmError::Migration(format!(
            "No migration registered for {} (expected a factory named '{}')",
            descriptor.name, descriptor.key
        )))
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.factories.keys().collect();
        keys.sort();
        f.debug_struct("MigrationRegistry")
            .field("directory", &self.directory)
            .field("factories", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::DatabaseFacade;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    struct Noop;

    #[async_trait]
    impl MigrationUnit for Noop {
        async fn apply(&self, _db: &dyn DatabaseFacade) -> OrmResult<bool> {
            Ok(true)
        }

        async fn seed(&self, _db: &dyn DatabaseFacade) -> OrmResult<bool> {
            Ok(true)
        }
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "").unwrap();
    }

    fn names(units: &[MigrationDescriptor]) -> Vec<&str> {
        units.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn test_discover_sorts_and_skips_hidden() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2024_02_add_index.migration");
        touch(dir.path(), "2024_01_create_users.migration");
        touch(dir.path(), ".gitkeep");
        fs::create_dir(dir.path().join("archive")).unwrap();

        let registry = MigrationRegistry::new(dir.path());
        let units = registry.discover().unwrap();
        assert_eq!(
            names(&units),
            vec!["2024_01_create_users.migration", "2024_02_add_index.migration"]
        );
        assert_eq!(units[0].key, "2024_01_create_users");
    }

    #[test]
    fn test_pending_excludes_applied() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2024_01_create_users.migration");
        touch(dir.path(), "2024_02_add_index.migration");

        let registry = MigrationRegistry::new(dir.path());
        let applied: BTreeSet<String> = ["2024_01_create_users.migration".to_string()].into();
        let pending = registry.pending(&applied).unwrap();
        assert_eq!(names(&pending), vec!["2024_02_add_index.migration"]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let registry = MigrationRegistry::new("/no/such/migrations");
        assert!(matches!(registry.discover(), Err(OrmError::Migration(_))));
    }

    #[test]
    fn test_instantiate_resolution() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2024_01_create_users.migration");
        touch(dir.path(), "2024_02_notes.sql");
        touch(dir.path(), "2024_03_orphan.migration");

        let mut registry = MigrationRegistry::new(dir.path());
        registry.register("2024_01_create_users", || Box::new(Noop));
        assert!(registry.is_registered("2024_01_create_users"));

        let units = registry.discover().unwrap();
        assert!(registry.instantiate(&units[0], SqlDialect::SQLite).is_ok());
        assert!(registry.instantiate(&units[1], SqlDialect::SQLite).is_ok());
        assert!(matches!(
            registry.instantiate(&units[2], SqlDialect::SQLite),
            Err(OrmError::Migration(_))
        ));
    }
}
