//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment (§6.1):
//! - YAML file loading (`.hivemind/config.yaml`, `.hivemind/local.yaml`)
//! - `HIVEMIND_*` environment variable overrides
//! - Configuration validation
//! - Type-safe config structs (re-exported from [`crate::domain::models::config`])

mod loader;

pub use loader::{ConfigError, ConfigLoader};
