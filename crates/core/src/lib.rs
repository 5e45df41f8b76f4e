//! # strata-core
//!
//! Configuration foundation shared by the strata crates: a dotted-key
//! repository over YAML files with per-environment overlays.

pub mod config;

pub use config::{ConfigError, ConfigLookup, ConfigRepository, Environment};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
