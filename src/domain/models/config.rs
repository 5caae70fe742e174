//! Runtime configuration for the coordinator process.

use serde::{Deserialize, Serialize};

/// Top-level configuration structure for the Hive-Mind Coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Maximum number of concurrently live agents per swarm (1-512).
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Durable store configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Scheduler tuning.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Consensus defaults.
    #[serde(default)]
    pub consensus: ConsensusConfig,

    /// Collective memory tuning.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Queen auto-scaling behavior.
    #[serde(default)]
    pub queen: QueenConfig,
}

const fn default_max_workers() -> usize {
    16
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            scheduler: SchedulerConfig::default(),
            consensus: ConsensusConfig::default(),
            memory: MemoryConfig::default(),
            queen: QueenConfig::default(),
        }
    }
}

/// Durable store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection before failing.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_database_path() -> String {
    ".hivemind/hivemind.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_acquire_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory log files are rotated into, if file logging is enabled.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}

/// Scheduler tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Ready-queue size above which new task submissions are rejected with
    /// `Busy`.
    #[serde(default = "default_queue_high_watermark")]
    pub queue_high_watermark: usize,

    /// Maximum retry attempts for a failed task before it is left failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay, in milliseconds, for task retry.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay, in milliseconds, for task retry.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Dispatch loop tick interval, in milliseconds.
    #[serde(default = "default_dispatch_tick_ms")]
    pub dispatch_tick_ms: u64,

    /// How long an agent must sit `idle` before it becomes eligible to
    /// steal onto a saturated `parallel` task (§4.5 step 6).
    #[serde(default = "default_steal_idle_ms")]
    pub steal_idle_ms: u64,
}

const fn default_queue_high_watermark() -> usize {
    1000
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_dispatch_tick_ms() -> u64 {
    500
}

const fn default_steal_idle_ms() -> u64 {
    5_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queue_high_watermark: default_queue_high_watermark(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            dispatch_tick_ms: default_dispatch_tick_ms(),
            steal_idle_ms: default_steal_idle_ms(),
        }
    }
}

/// Consensus defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConsensusConfig {
    /// Default algorithm used when a proposal doesn't specify one.
    #[serde(default = "default_algorithm")]
    pub default_algorithm: String,

    /// Default voting window, in seconds.
    #[serde(default = "default_deadline_secs")]
    pub default_deadline_secs: i64,

    /// Minimum fraction of eligible voters who must vote before a deadline
    /// can resolve to anything other than `timed_out`.
    #[serde(default = "default_participation_floor")]
    pub participation_floor: f64,
}

fn default_algorithm() -> String {
    "majority".to_string()
}

const fn default_deadline_secs() -> i64 {
    60
}

const fn default_participation_floor() -> f64 {
    0.5
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            default_algorithm: default_algorithm(),
            default_deadline_secs: default_deadline_secs(),
            participation_floor: default_participation_floor(),
        }
    }
}

/// Collective memory tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemoryConfig {
    /// Maximum number of entries held in the in-process cache in front of
    /// the store.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Interval, in seconds, between expired-entry sweeps.
    #[serde(default = "default_expiry_sweep_secs")]
    pub expiry_sweep_secs: u64,

    /// Interval, in seconds, between size-based eviction sweeps.
    #[serde(default = "default_eviction_sweep_secs")]
    pub eviction_sweep_secs: u64,
}

const fn default_cache_capacity() -> usize {
    10_000
}

const fn default_expiry_sweep_secs() -> u64 {
    60
}

const fn default_eviction_sweep_secs() -> u64 {
    3600
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            expiry_sweep_secs: default_expiry_sweep_secs(),
            eviction_sweep_secs: default_eviction_sweep_secs(),
        }
    }
}

/// Queen auto-scaling behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueenConfig {
    /// Default topology for newly spawned swarms: `hierarchical` or `mesh`.
    #[serde(default = "default_topology")]
    pub default_topology: String,

    /// Whether automatic pool scaling is enabled.
    #[serde(default = "default_autoscale_enabled")]
    pub autoscale_enabled: bool,

    /// Ready-queue depth per idle agent that triggers scaling up.
    #[serde(default = "default_scale_up_threshold")]
    pub scale_up_threshold: usize,

    /// Maximum restarts allowed within `restart_window_secs` before an
    /// agent is left offline instead of recovered.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: usize,

    /// Sliding window, in seconds, over which `max_restarts` is counted.
    #[serde(default = "default_restart_window_secs")]
    pub restart_window_secs: i64,

    /// Auto-scale check interval, in milliseconds.
    #[serde(default = "default_autoscale_tick_ms")]
    pub autoscale_tick_ms: u64,
}

fn default_topology() -> String {
    "hierarchical".to_string()
}

const fn default_autoscale_enabled() -> bool {
    true
}

const fn default_scale_up_threshold() -> usize {
    3
}

const fn default_max_restarts() -> usize {
    5
}

const fn default_restart_window_secs() -> i64 {
    600
}

const fn default_autoscale_tick_ms() -> u64 {
    2_000
}

impl Default for QueenConfig {
    fn default() -> Self {
        Self {
            default_topology: default_topology(),
            autoscale_enabled: default_autoscale_enabled(),
            scale_up_threshold: default_scale_up_threshold(),
            max_restarts: default_max_restarts(),
            restart_window_secs: default_restart_window_secs(),
            autoscale_tick_ms: default_autoscale_tick_ms(),
        }
    }
}
