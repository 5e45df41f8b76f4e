//! Dotted-key configuration repository
//!
//! Every `*.yaml` / `*.yml` file in the configuration directory becomes a
//! top-level key named after the file stem, so `database.yaml` answers
//! lookups such as `database.connections.main.url`. Files under
//! `<dir>/<environment>/` are deep-merged over the base files.

use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{ConfigError, Environment};

/// Read-only key/value lookup consumed by the database and migration layers.
pub trait ConfigLookup: Send + Sync {
    /// Look up a dotted key such as `database.migration.table`
    fn get(&self, key: &str) -> Option<Value>;

    /// Look up a scalar value rendered as a string
    fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Look up a scalar value, falling back to `default`
    fn get_str_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or_else(|| default.to_string())
    }

    /// Check whether a key resolves to any value
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Configuration tree loaded from a directory of YAML files.
#[derive(Debug, Clone, Default)]
pub struct ConfigRepository {
    root: Mapping,
}

impl ConfigRepository {
    /// Create an empty repository, useful for programmatic configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from an already parsed YAML tree
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Ok(Self::default()),
            other => Err(ConfigError::invalid_value(
                "<root>",
                format!("{:?}", other),
                "a mapping of configuration sections",
            )),
        }
    }

    /// Load every YAML file in `dir`, then apply the overlay for `environment`
    pub fn load(dir: impl AsRef<Path>, environment: Environment) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ConfigError::FileSystemError {
                message: format!("configuration directory not found: {}", dir.display()),
            });
        }

        let mut root = Mapping::new();
        for (name, path) in yaml_files(dir)? {
            debug!("loading config section '{}' from {}", name, path.display());
            root.insert(Value::String(name), read_yaml(&path)?);
        }

        let overlay_dir = dir.join(environment.as_str());
        if overlay_dir.is_dir() {
            for (name, path) in yaml_files(&overlay_dir)? {
                debug!("applying {} overlay for '{}'", environment, name);
                let overlay = read_yaml(&path)?;
                let key = Value::String(name);
                match root.get_mut(&key) {
                    Some(base) => deep_merge(base, overlay),
                    None => {
                        root.insert(key, overlay);
                    }
                }
            }
        }

        Ok(Self { root })
    }

    /// Set a dotted key, creating intermediate sections as needed
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let mut segments: Vec<&str> = key.split('.').collect();
        let last = match segments.pop() {
            Some(last) => last,
            None => return,
        };

        let mut node = &mut self.root;
        for segment in segments {
            let entry = node
                .entry(Value::String(segment.to_string()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !entry.is_mapping() {
                *entry = Value::Mapping(Mapping::new());
            }
            node = match entry {
                Value::Mapping(map) => map,
                _ => return,
            };
        }
        node.insert(Value::String(last.to_string()), value.into());
    }
}

impl ConfigLookup for ConfigRepository {
    fn get(&self, key: &str) -> Option<Value> {
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_mapping()?.get(segment)?;
        }
        Some(current.clone())
    }
}

fn yaml_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, ConfigError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext == "yaml" || ext == "yml");
        if !is_yaml {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&contents)
        .map_err(|e| ConfigError::parsing(path.display().to_string(), e.to_string()))?;
    // An empty file is an empty section.
    Ok(match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

/// Recursively merge `overlay` into `base`; mappings merge, everything else replaces.
fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_dotted_lookup_across_files() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "database.yaml",
            "default: main\nmigration:\n  table: schema_log\nconnections:\n  main:\n    url: 'sqlite::memory:'\n",
        );
        write(dir.path(), "path.yml", "migration: db/migrations\n");
        write(dir.path(), "notes.txt", "ignored");

        let config = ConfigRepository::load(dir.path(), Environment::Development).unwrap();
        assert_eq!(config.get_str("database.default").as_deref(), Some("main"));
        assert_eq!(config.get_str("database.migration.table").as_deref(), Some("schema_log"));
        assert_eq!(config.get_str("path.migration").as_deref(), Some("db/migrations"));
        assert_eq!(
            config.get_str("database.connections.main.url").as_deref(),
            Some("sqlite::memory:")
        );
        assert!(!config.has("notes"));
        assert!(config.get("database.connections.missing.url").is_none());
        assert_eq!(config.get_str_or("database.prefix", "none"), "none");
    }

    #[test]
    fn test_environment_overlay_merges_recursively() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "database.yaml",
            "default: main\nconnections:\n  main:\n    url: sqlite://dev.db\n    prefix: app_\n",
        );
        fs::create_dir(dir.path().join("production")).unwrap();
        write(
            &dir.path().join("production"),
            "database.yaml",
            "connections:\n  main:\n    url: postgres://db/prod\n",
        );
        write(&dir.path().join("production"), "path.yaml", "migration: /srv/migrations\n");

        let config = ConfigRepository::load(dir.path(), Environment::Production).unwrap();
        assert_eq!(
            config.get_str("database.connections.main.url").as_deref(),
            Some("postgres://db/prod")
        );
        assert_eq!(config.get_str("database.connections.main.prefix").as_deref(), Some("app_"));
        assert_eq!(config.get_str("database.default").as_deref(), Some("main"));
        assert_eq!(config.get_str("path.migration").as_deref(), Some("/srv/migrations"));

        let development = ConfigRepository::load(dir.path(), Environment::Development).unwrap();
        assert_eq!(
            development.get_str("database.connections.main.url").as_deref(),
            Some("sqlite://dev.db")
        );
    }

    #[test]
    fn test_set_creates_sections() {
        let mut config = ConfigRepository::new();
        config.set("database.migration.table", "ledger");
        config.set("database.connections.main.url", "sqlite::memory:");

        assert_eq!(config.get_str("database.migration.table").as_deref(), Some("ledger"));
        assert!(config.get("database.connections").unwrap().is_mapping());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let err = ConfigRepository::load("/definitely/not/here", Environment::Testing).unwrap_err();
        assert!(matches!(err, ConfigError::FileSystemError { .. }));
    }

    #[test]
    fn test_invalid_yaml_reports_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "database.yaml", "connections: [unclosed\n");
        let err = ConfigRepository::load(dir.path(), Environment::Development).unwrap_err();
        assert!(err.to_string().contains("database.yaml"));
    }
}
