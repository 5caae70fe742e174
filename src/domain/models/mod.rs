//! Domain models
//!
//! Pure domain entities with business logic and validation rules.
//! These models are framework-agnostic and contain no infrastructure concerns.

pub mod agent;
pub mod capability;
pub mod config;
pub mod consensus;
pub mod event;
pub mod memory;
pub mod message;
pub mod queue;
pub mod swarm;
pub mod task;

pub use agent::{Agent, AgentId, AgentRole, AgentStatus};
pub use capability::{AgentTypeCatalog, AgentTypeDef, Capability};
pub use config::{
    Config, ConsensusConfig, DatabaseConfig, LoggingConfig, MemoryConfig, QueenConfig,
    SchedulerConfig,
};
pub use consensus::{
    ConsensusAlgorithm, ConsensusResult, Proposal, ProposalId, ProposalStatus, Vote,
};
pub use event::{EventEnvelope, SystemEvent};
pub use memory::{MemoryEntry, RetentionPolicy};
pub use message::{Message, MessageBody, MessagePriority, MessageTarget};
pub use queue::{QueueItem, TaskQueue};
pub use swarm::{QueenMode, Swarm, SwarmId, SwarmStatus, Topology};
pub use task::{ExecutionStrategy, OnFailure, Task, TaskId, TaskPriority, TaskStatus};
