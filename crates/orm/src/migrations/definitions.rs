//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the fundamental types used throughout the migration system:
//! actions, tracking records, configuration and run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use strata_core::ConfigLookup;

use crate::error::OrmError;

/// Configuration key for the tracking table name
pub const MIGRATION_TABLE_KEY: &str = "database.migration.table";
/// Configuration key for the migrations directory
pub const MIGRATION_PATH_KEY: &str = "path.migration";
/// Configuration key for the recording mode (`per_unit` or `batch`)
pub const MIGRATION_RECORDING_KEY: &str = "database.migration.recording";

pub const DEFAULT_MIGRATION_TABLE: &str = "migrations";
pub const DEFAULT_MIGRATION_PATH: &str = "migration";

/// One of the three things a migration unit can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationAction {
    /// Forward schema change (`up`)
    Apply,
    /// Undo the schema change (`down`)
    Reverse,
    /// Populate data
    Seed,
}

impl MigrationAction {
    pub const ALL: [MigrationAction; 3] = [
        MigrationAction::Apply,
        MigrationAction::Reverse,
        MigrationAction::Seed,
    ];

    /// Value stored in the tracking table
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationAction::Apply => "apply",
            MigrationAction::Reverse => "reverse",
            MigrationAction::Seed => "seed",
        }
    }
}

impl fmt::Display for MigrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationAction {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" | "apply" => Ok(MigrationAction::Apply),
            "down" | "reverse" | "rollback" => Ok(MigrationAction::Reverse),
            "seed" => Ok(MigrationAction::Seed),
            other => Err(OrmError::Migration(format!(
                "Unknown migration action '{}' (expected up, down or seed)",
                other
            ))),
        }
    }
}

/// A row of the tracking table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigrationRecord {
    /// Unit name (its source file name)
    pub migration: String,
    /// Action recorded for the unit
    pub action: MigrationAction,
    /// Assigned by the store; `None` if the backend value could not be parsed
    pub applied_at: Option<DateTime<Utc>>,
}

/// When successful units are written to the tracking table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    /// Record each unit right after it succeeds
    #[default]
    PerUnit,
    /// Record all successes in one insert after the loop; an abort loses them
    Batch,
}

impl FromStr for RecordingMode {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "per_unit" | "unit" => Ok(RecordingMode::PerUnit),
            "batch" => Ok(RecordingMode::Batch),
            other => Err(OrmError::Configuration(format!(
                "Unknown recording mode '{}' (expected per_unit or batch)",
                other
            ))),
        }
    }
}

/// Configuration for the migration system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
    /// Logical table name for tracking migrations
    pub migrations_table: String,
    pub recording: RecordingMode,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from(DEFAULT_MIGRATION_PATH),
            migrations_table: DEFAULT_MIGRATION_TABLE.to_string(),
            recording: RecordingMode::default(),
        }
    }
}

impl MigrationConfig {
    /// Read table, directory and recording mode from configuration
    pub fn from_config(config: &dyn ConfigLookup) -> Result<Self, OrmError> {
        let recording = match config.get_str(MIGRATION_RECORDING_KEY) {
            Some(mode) => mode.parse()?,
            None => RecordingMode::default(),
        };
        Ok(Self {
            migrations_dir: PathBuf::from(config.get_str_or(MIGRATION_PATH_KEY, DEFAULT_MIGRATION_PATH)),
            migrations_table: config.get_str_or(MIGRATION_TABLE_KEY, DEFAULT_MIGRATION_TABLE),
            recording,
        })
    }
}

/// Result of one runner invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRunResult {
    pub action: MigrationAction,
    /// Units whose action succeeded, in execution order
    pub applied: Vec<String>,
    /// Units whose action reported failure and stay pending
    pub skipped: Vec<String>,
    /// Pending units at the start of the run
    pub pending_count: usize,
    /// The migrations directory could not be listed
    pub directory_missing: bool,
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    pub(crate) fn empty(action: MigrationAction) -> Self {
        Self {
            action,
            applied: Vec::new(),
            skipped: Vec::new(),
            pending_count: 0,
            directory_missing: false,
            execution_time_ms: 0,
        }
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Nothing was pending
    pub fn is_noop(&self) -> bool {
        self.pending_count == 0
    }
}

/// Tracking state of one discovered unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStatus {
    pub migration: String,
    /// Actions recorded for this unit, in apply/reverse/seed order
    pub recorded: Vec<MigrationAction>,
}

impl UnitStatus {
    pub fn is_recorded(&self, action: MigrationAction) -> bool {
        self.recorded.contains(&action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ConfigRepository;

    #[test]
    fn test_action_aliases() {
        assert_eq!("up".parse::<MigrationAction>().unwrap(), MigrationAction::Apply);
        assert_eq!("apply".parse::<MigrationAction>().unwrap(), MigrationAction::Apply);
        assert_eq!("down".parse::<MigrationAction>().unwrap(), MigrationAction::Reverse);
        assert_eq!("Rollback".parse::<MigrationAction>().unwrap(), MigrationAction::Reverse);
        assert_eq!("seed".parse::<MigrationAction>().unwrap(), MigrationAction::Seed);
        assert!("sideways".parse::<MigrationAction>().is_err());

        let stored: Vec<&str> = MigrationAction::ALL.iter().map(|a| a.as_str()).collect();
        assert_eq!(stored, vec!["apply", "reverse", "seed"]);
    }

    #[test]
    fn test_config_defaults() {
        let config = MigrationConfig::from_config(&ConfigRepository::new()).unwrap();
        assert_eq!(config, MigrationConfig::default());
        assert_eq!(config.migrations_table, "migrations");
        assert_eq!(config.migrations_dir, PathBuf::from("migration"));
        assert_eq!(config.recording, RecordingMode::PerUnit);
    }

    #[test]
    fn test_config_overrides() {
        let mut repository = ConfigRepository::new();
        repository.set(MIGRATION_TABLE_KEY, "schema_log");
        repository.set(MIGRATION_PATH_KEY, "db/migrations");
        repository.set(MIGRATION_RECORDING_KEY, "batch");

        let config = MigrationConfig::from_config(&repository).unwrap();
        assert_eq!(config.migrations_table, "schema_log");
        assert_eq!(config.migrations_dir, PathBuf::from("db/migrations"));
        assert_eq!(config.recording, RecordingMode::Batch);

        repository.set(MIGRATION_RECORDING_KEY, "sometimes");
        assert!(matches!(
            MigrationConfig::from_config(&repository),
            Err(OrmError::Configuration(_))
        ));
    }
}
