//! Database Backend Abstractions
//!
//! The [`DatabaseFacade`] trait is the only database surface the migration
//! engine consumes. [`AnyDatabase`] implements it for PostgreSQL, MySQL and
//! SQLite through sqlx's `Any` driver.

pub mod any;
pub mod core;

pub use any::AnyDatabase;
pub use self::core::*;
