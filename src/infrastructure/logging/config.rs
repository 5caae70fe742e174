use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::models::config::LoggingConfig as DomainLoggingConfig;

/// Logging configuration, derived from the coordinator's
/// [`DomainLoggingConfig`] plus process-level concerns (`--verbose`,
/// rotation, retention) that don't belong on the persisted config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_format")]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to stdout)
    pub log_dir: Option<PathBuf>,

    /// Enable stdout logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,

    /// Log retention in days
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Daily,
    Hourly,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::Daily
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> i64 {
    30
}

impl LogConfig {
    /// Builds a process-level log config from the persisted coordinator
    /// config, applying a `--verbose` override on top (bumps the level
    /// to `debug` when requested but never downgrades an explicit
    /// `trace`).
    pub fn from_domain(config: &DomainLoggingConfig, verbose: bool) -> Self {
        let format = match config.format.as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        let level = if verbose && config.level != "trace" {
            "debug".to_string()
        } else {
            config.level.clone()
        };
        Self {
            level,
            format,
            log_dir: config.directory.as_ref().map(PathBuf::from),
            enable_stdout: true,
            rotation: RotationPolicy::Daily,
            retention_days: default_retention_days(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_flag_bumps_info_to_debug() {
        let domain = DomainLoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        };
        let log_config = LogConfig::from_domain(&domain, true);
        assert_eq!(log_config.level, "debug");
    }

    #[test]
    fn verbose_flag_does_not_downgrade_trace() {
        let domain = DomainLoggingConfig {
            level: "trace".to_string(),
            format: "pretty".to_string(),
            directory: None,
        };
        let log_config = LogConfig::from_domain(&domain, true);
        assert_eq!(log_config.level, "trace");
    }

    #[test]
    fn json_format_maps_through() {
        let domain = DomainLoggingConfig {
            level: "info".to_string(),
            format: "json".to_string(),
            directory: Some("/var/log/hivemind".to_string()),
        };
        let log_config = LogConfig::from_domain(&domain, false);
        assert_eq!(log_config.format, LogFormat::Json);
        assert_eq!(log_config.log_dir, Some(PathBuf::from("/var/log/hivemind")));
    }
}
