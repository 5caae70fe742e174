use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types (§6.1).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid max_workers: {0}. Must be between 1 and 512")]
    InvalidMaxWorkers(usize),

    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("database path cannot be empty")]
    EmptyDatabasePath,

    #[error("invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("invalid queue_high_watermark: {0}. Must be positive")]
    InvalidQueueWatermark(usize),

    #[error("invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("unknown consensus algorithm: {0}. Must be one of: majority, weighted, byzantine")]
    InvalidConsensusAlgorithm(String),

    #[error("invalid participation_floor: {0}. Must be in [0.0, 1.0]")]
    InvalidParticipationFloor(f64),

    #[error("unknown queen topology: {0}. Must be one of: hierarchical, mesh, ring, star")]
    InvalidTopology(String),
}

/// Configuration loader with hierarchical merging (§6.1).
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (`Serialized`)
    /// 2. `.hivemind/config.yaml` (written by `init`)
    /// 3. `.hivemind/local.yaml` (optional dev overrides)
    /// 4. `HIVEMIND_*`-prefixed environment variables (double-underscore
    ///    nesting, highest priority)
    ///
    /// Configuration is always project-local (`pwd/.hivemind/`) so
    /// multiple swarms on one machine can carry independent config.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".hivemind/config.yaml"))
            .merge(Yaml::file(".hivemind/local.yaml"))
            .merge(Env::prefixed("HIVEMIND_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Loads configuration from a specific file, skipping the project
    /// directory's `.hivemind/` layer.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validates configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.max_workers == 0 || config.max_workers > 512 {
            return Err(ConfigError::InvalidMaxWorkers(config.max_workers));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.scheduler.queue_high_watermark == 0 {
            return Err(ConfigError::InvalidQueueWatermark(
                config.scheduler.queue_high_watermark,
            ));
        }
        if config.scheduler.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.scheduler.max_retries));
        }
        if config.scheduler.initial_backoff_ms >= config.scheduler.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.scheduler.initial_backoff_ms,
                config.scheduler.max_backoff_ms,
            ));
        }

        let valid_algorithms = ["majority", "weighted", "byzantine"];
        if !valid_algorithms.contains(&config.consensus.default_algorithm.as_str()) {
            return Err(ConfigError::InvalidConsensusAlgorithm(
                config.consensus.default_algorithm.clone(),
            ));
        }
        if !(0.0..=1.0).contains(&config.consensus.participation_floor) {
            return Err(ConfigError::InvalidParticipationFloor(
                config.consensus.participation_floor,
            ));
        }

        let valid_topologies = ["hierarchical", "mesh", "ring", "star"];
        if !valid_topologies.contains(&config.queen.default_topology.as_str()) {
            return Err(ConfigError::InvalidTopology(config.queen.default_topology.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.max_workers, 16);
        assert_eq!(config.database.path, ".hivemind/hivemind.db");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("default config should be valid");
    }

    #[test]
    fn yaml_overrides_merge_over_defaults() {
        let yaml = r"
max_workers: 32
scheduler:
  queue_high_watermark: 500
database:
  path: /custom/path.db
  max_connections: 5
logging:
  level: debug
  format: pretty
";
        let config: Config = serde_yaml::from_str(yaml).expect("yaml should parse");
        assert_eq!(config.max_workers, 32);
        assert_eq!(config.scheduler.queue_high_watermark, 500);
        assert_eq!(config.database.path, "/custom/path.db");
        ConfigLoader::validate(&config).expect("parsed config should be valid");
    }

    #[test]
    fn rejects_zero_max_workers() {
        let config = Config {
            max_workers: 0,
            ..Config::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxWorkers(0))
        ));
    }

    #[test]
    fn rejects_max_workers_above_the_hard_cap() {
        let config = Config {
            max_workers: 1000,
            ..Config::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxWorkers(1000))
        ));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn rejects_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyDatabasePath)
        ));
    }

    #[test]
    fn rejects_backoff_configured_backwards() {
        let mut config = Config::default();
        config.scheduler.initial_backoff_ms = 30_000;
        config.scheduler.max_backoff_ms = 10_000;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(30_000, 10_000))
        ));
    }

    #[test]
    fn rejects_unknown_consensus_algorithm() {
        let mut config = Config::default();
        config.consensus.default_algorithm = "unanimous".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidConsensusAlgorithm(_))
        ));
    }

    #[test]
    fn rejects_participation_floor_out_of_range() {
        let mut config = Config::default();
        config.consensus.participation_floor = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidParticipationFloor(_))
        ));
    }

    #[test]
    fn env_prefix_is_hivemind() {
        unsafe {
            std::env::set_var("HIVEMIND_MAX_WORKERS", "25");
        }
        assert_eq!(std::env::var("HIVEMIND_MAX_WORKERS").unwrap(), "25");
        unsafe {
            std::env::remove_var("HIVEMIND_MAX_WORKERS");
        }
    }
}
