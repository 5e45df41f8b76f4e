//! Migration Manager - File system operations for migrations
//!
//! Handles creating migration templates and loading `.sql` migration files
//! into runnable units.

use chrono::Utc;
use sqlparser::dialect::{Dialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use std::fs;
use std::path::Path;

use super::definitions::MigrationConfig;
use super::unit::SqlFileMigration;
use crate::backends::SqlDialect;
use crate::error::{OrmError, OrmResult};

/// Raw statements of each section of a migration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSections {
    pub up: String,
    pub down: String,
    pub seed: String,
}

#[derive(Clone, Copy)]
enum Section {
    Preamble,
    Up,
    Down,
    Seed,
}

/// Migration manager for creating and loading migration files
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    /// Create a new migration manager with default configuration
    pub fn new() -> Self {
        Self::with_config(MigrationConfig::default())
    }

    /// Create a new migration manager with custom configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Create a new migration file and return its file name
    pub fn create_migration(&self, name: &str) -> OrmResult<String> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(OrmError::Migration(format!("Invalid migration name '{}'", name)));
        }

        fs::create_dir_all(&self.config.migrations_dir)
            .map_err(|e| OrmError::Migration(format!("Failed to create migrations directory: {}", e)))?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let filename = format!("{}_{}.sql", timestamp, slug);
        let filepath = self.config.migrations_dir.join(&filename);
        if filepath.exists() {
            return Err(OrmError::Migration(format!("Migration file {} already exists", filename)));
        }

        fs::write(&filepath, Self::migration_template(name))
            .map_err(|e| OrmError::Migration(format!("Failed to write migration file: {}", e)))?;

        Ok(filename)
    }

    /// Load a `.sql` migration file as a unit
    pub fn load_sql_unit(&self, path: &Path, dialect: SqlDialect) -> OrmResult<SqlFileMigration> {
        let content = fs::read_to_string(path).map_err(|e| {
            OrmError::Migration(format!("Failed to read migration file {}: {}", path.display(), e))
        })?;
        let sections = Self::parse_sections(&content);
        Ok(SqlFileMigration {
            up: Self::split_sql_statements(&sections.up, dialect),
            down: Self::split_sql_statements(&sections.down, dialect),
            seed: Self::split_sql_statements(&sections.seed, dialect),
        })
    }

    /// Split file content on the `-- Up migration`, `-- Down migration` and `-- Seed` markers
    pub fn parse_sections(content: &str) -> MigrationSections {
        let mut up = Vec::new();
        let mut down = Vec::new();
        let mut seed = Vec::new();
        let mut current = Section::Preamble;

        for line in content.lines() {
            let trimmed = line.trim();
            if let Some(comment) = trimmed.strip_prefix("--") {
                let marker = comment
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase();
                match marker.as_str() {
                    "up migration" => current = Section::Up,
                    "down migration" => current = Section::Down,
                    "seed" => current = Section::Seed,
                    _ => {}
                }
                continue;
            }
            if trimmed.is_empty() {
                continue;
            }

            match current {
                Section::Up => up.push(line),
                Section::Down => down.push(line),
                Section::Seed => seed.push(line),
                Section::Preamble => {}
            }
        }

        MigrationSections {
            up: up.join("\n").trim().to_string(),
            down: down.join("\n").trim().to_string(),
            seed: seed.join("\n").trim().to_string(),
        }
    }

    /// Split SQL into statements with the dialect's parser
    pub fn split_sql_statements(sql: &str, dialect: SqlDialect) -> Vec<String> {
        if sql.trim().is_empty() {
            return Vec::new();
        }

        let parser_dialect: Box<dyn Dialect> = match dialect {
            SqlDialect::MySQL => Box::new(MySqlDialect {}),
            SqlDialect::SQLite => Box::new(SQLiteDialect {}),
            SqlDialect::SqlServer => Box::new(MsSqlDialect {}),
            SqlDialect::PostgreSQL => Box::new(PostgreSqlDialect {}),
        };

        match Parser::parse_sql(parser_dialect.as_ref(), sql) {
            Ok(statements) => statements.iter().map(|stmt| stmt.to_string()).collect(),
            Err(e) => {
                tracing::warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
                sql.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            }
        }
    }

    fn migration_template(name: &str) -> String {
        format!(
            "-- Migration: {}\n\
             -- Created: {}\n\n\
             -- Up migration\n\n\n\
             -- Down migration\n\n\n\
             -- Seed\n\n",
            name,
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
