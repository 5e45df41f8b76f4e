//! Error types for the database and migration layers
//!
//! Database failures, tracking-table constraint violations and migration
//! resolution problems all surface through [`OrmError`].

use std::fmt;

use strata_core::ConfigError;

/// ORM result type alias
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database and migration operations
#[derive(Debug, Clone)]
pub enum OrmError {
    /// Database connection or query error
    Database(String),
    /// A unique constraint rejected a write
    ConstraintViolation(String),
    /// Connection setup error
    Connection(String),
    /// Migration discovery, resolution or execution error
    Migration(String),
    /// The configured dialect has no runtime driver
    UnsupportedDialect(String),
    /// Configuration error
    Configuration(String),
    /// Filesystem error
    Io(String),
}

impl fmt::Display for OrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrmError::Database(msg) => write!(f, "Database error: {}", msg),
            OrmError::ConstraintViolation(msg) => write!(f, "Constraint violation: {}", msg),
            OrmError::Connection(msg) => write!(f, "Connection error: {}", msg),
            OrmError::Migration(msg) => write!(f, "Migration error: {}", msg),
            OrmError::UnsupportedDialect(msg) => write!(f, "Unsupported dialect: {}", msg),
            OrmError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            OrmError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for OrmError {}

impl OrmError {
    /// Whether this error came from the tracking table's unique constraint
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, OrmError::ConstraintViolation(_))
    }
}

// Convert from sqlx errors, keeping unique violations distinguishable
impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                OrmError::ConstraintViolation(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                OrmError::Connection(err.to_string())
            }
            _ => OrmError::Database(err.to_string()),
        }
    }
}

impl From<std::io::Error> for OrmError {
    fn from(err: std::io::Error) -> Self {
        OrmError::Io(err.to_string())
    }
}

impl From<ConfigError> for OrmError {
    fn from(err: ConfigError) -> Self {
        OrmError::Configuration(err.to_string())
    }
}

impl From<serde_yaml::Error> for OrmError {
    fn from(err: serde_yaml::Error) -> Self {
        OrmError::Configuration(err.to_string())
    }
}
