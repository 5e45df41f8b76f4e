//! # strata-orm: database facade and schema migrations
//!
//! Provides the database facade the migration engine runs against, named
//! connections resolved from configuration, and the migration engine itself:
//! discovery, pending-set computation, execution and tracking.

pub mod backends;
pub mod database;
pub mod error;
pub mod migrations;

// Re-export core traits and types
pub use backends::{AnyDatabase, DatabaseFacade, DatabaseRow, DatabaseValue, DropOutcome, SqlDialect};
pub use database::*;
pub use error::*;
pub use migrations::*;
