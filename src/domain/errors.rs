//! Error taxonomy for the Hive-Mind Coordinator.
//!
//! One enum covers every failure surface named in the specification: bad
//! input, missing entities, scheduling conflicts, memory capacity, bus
//! timeouts, and store degradation. CLI and library callers both match on
//! this type; the CLI additionally maps it to a process exit code.

use thiserror::Error;
use uuid::Uuid;

/// Coordinator-level errors.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Malformed input from the caller (missing field, bad enum value, etc.).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Reference to an absent swarm, agent, task, or proposal.
    #[error("unknown {kind}: {id}")]
    UnknownEntity { kind: &'static str, id: String },

    /// No configured agent type covers the task's required capabilities.
    #[error("no agent type satisfies required capabilities: {0:?}")]
    UnsatisfiableCapability(Vec<String>),

    /// The task dependency graph contains a cycle.
    #[error("cyclic dependency detected involving task {0}")]
    CyclicDependency(Uuid),

    /// Dependency id does not refer to an existing task in the same swarm.
    #[error("unknown dependency task: {0}")]
    UnknownDependency(Uuid),

    /// The task queue high watermark has been exceeded.
    #[error("scheduler is busy: queue high watermark ({0}) exceeded")]
    Busy(usize),

    /// A memory namespace refused a write because it is full.
    #[error("memory namespace '{0}' capacity exceeded")]
    CapacityExceeded(String),

    /// A memory operation referenced a namespace that was never declared.
    #[error("unknown memory namespace: {0}")]
    NamespaceUnknown(String),

    /// A bus query exceeded its deadline before a response arrived.
    #[error("query {0} timed out waiting for a response")]
    QueryTimeout(Uuid),

    /// Durable store I/O failed; the coordinator has fallen back to an
    /// in-memory store for the remainder of this process's lifetime.
    #[error("durable store unavailable: {0}")]
    StoreUnavailable(String),

    /// The persisted schema is newer than this build knows how to read.
    #[error("schema version {found} is incompatible with supported version {supported}")]
    SchemaIncompatible { found: i64, supported: i64 },

    /// An invariant the coordinator depends on was violated. Fatal.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// Wraps a lower-level serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the coordinator.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

impl CoordinatorError {
    /// Process exit code per the command surface contract (§6): 0 success
    /// (not represented here), 1 unrecoverable error, 2 invalid usage.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidRequest(_) => 2,
            _ => 1,
        }
    }
}

impl From<sqlx::Error> for CoordinatorError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CoordinatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_exits_with_usage_code() {
        assert_eq!(CoordinatorError::InvalidRequest("x".into()).exit_code(), 2);
    }

    #[test]
    fn other_errors_exit_with_failure_code() {
        assert_eq!(CoordinatorError::Busy(10).exit_code(), 1);
        assert_eq!(
            CoordinatorError::StoreUnavailable("io".into()).exit_code(),
            1
        );
    }
}
