//! Coordinator-level system events, delivered to external subscribers
//! through the `subscribe()` stream (§4.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::AgentId;
use super::consensus::ProposalId;
use super::swarm::SwarmId;
use super::task::TaskId;

/// A notable state change broadcast to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SystemEvent {
    /// A swarm was spawned for a new objective.
    SwarmSpawned {
        /// The spawned swarm.
        swarm_id: SwarmId,
        /// The objective text it was spawned for.
        objective: String,
    },
    /// A swarm reached `terminated`.
    SwarmFinished {
        /// The finished swarm.
        swarm_id: SwarmId,
        /// Final status, as its wire string (always `"terminated"`).
        status: &'static str,
    },
    /// An agent was spawned into the pool.
    AgentSpawned {
        /// The owning swarm.
        swarm_id: SwarmId,
        /// The spawned agent.
        agent_id: AgentId,
        /// Its registered agent type.
        agent_type: String,
    },
    /// An agent was retired from the pool.
    AgentRetired {
        /// The owning swarm.
        swarm_id: SwarmId,
        /// The retired agent.
        agent_id: AgentId,
    },
    /// A task was submitted and admitted to the scheduler.
    TaskCreated {
        /// The owning swarm.
        swarm_id: SwarmId,
        /// The created task.
        task_id: TaskId,
    },
    /// A task was assigned to an agent.
    TaskAssigned {
        /// The owning swarm.
        swarm_id: SwarmId,
        /// The assigned task.
        task_id: TaskId,
        /// The agent it was assigned to.
        agent_id: AgentId,
    },
    /// An agent reported fractional progress on an in-progress task.
    TaskProgress {
        /// The owning swarm.
        swarm_id: SwarmId,
        /// The task whose progress changed.
        task_id: TaskId,
        /// Fractional progress in `[0.0, 1.0]`.
        progress: f64,
    },
    /// A task completed successfully.
    TaskCompleted {
        /// The owning swarm.
        swarm_id: SwarmId,
        /// The completed task.
        task_id: TaskId,
    },
    /// A task failed and exhausted its retry budget.
    TaskFailed {
        /// The owning swarm.
        swarm_id: SwarmId,
        /// The failed task.
        task_id: TaskId,
        /// The failure reason.
        error: String,
    },
    /// A decision was opened for a vote.
    DecisionOpen {
        /// The owning swarm.
        swarm_id: SwarmId,
        /// The opened proposal.
        proposal_id: ProposalId,
    },
    /// A decision reached its outcome or timed out.
    DecisionClosed {
        /// The owning swarm.
        swarm_id: SwarmId,
        /// The resolved proposal.
        proposal_id: ProposalId,
        /// Final status, as its wire string.
        status: &'static str,
    },
    /// A value was written into collective memory.
    MemoryStored {
        /// The owning swarm.
        swarm_id: SwarmId,
        /// The namespace written to.
        namespace: String,
        /// The key written.
        key: String,
    },
    /// The Queen scaled the agent pool up or down.
    PoolScaled {
        /// The owning swarm.
        swarm_id: SwarmId,
        /// Agent count before the scaling action.
        previous_size: usize,
        /// Agent count after the scaling action.
        new_size: usize,
    },
    /// A recoverable error occurred outside the normal task-failure path
    /// (e.g. an agent exhausted its restart budget).
    ErrorOccurred {
        /// The owning swarm, if the error is scoped to one.
        swarm_id: Option<SwarmId>,
        /// Human-readable description of what went wrong.
        message: String,
    },
}

/// An event plus the metadata subscribers need to order and dedupe the
/// stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Monotonically increasing per-process sequence number.
    pub sequence: u64,
    /// Unique identifier for this delivery.
    pub id: Uuid,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// The event itself.
    pub event: SystemEvent,
}
