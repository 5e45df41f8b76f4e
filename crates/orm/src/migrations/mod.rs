//! Migration System
//!
//! Discovers migration units, works out which are pending for an action, runs
//! them in order and records the outcome in the tracking table.

pub mod definitions;
pub mod log;
pub mod manager;
pub mod registry;
pub mod runner;
pub mod schema_builder;
pub mod store;
pub mod unit;

pub use definitions::*;
pub use log::{format_line, ConsoleLog, MemoryLog, MigrationLog};
pub use manager::{MigrationManager, MigrationSections};
pub use registry::{MigrationDescriptor, MigrationRegistry, UnitFactory};
pub use runner::{apply_migrations, MigrationRunner};
pub use schema_builder::TrackingTableDdl;
pub use store::AppliedMigrationStore;
pub use unit::{MigrationUnit, SqlFileMigration};
