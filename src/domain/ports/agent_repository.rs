//! Agent repository port.

use async_trait::async_trait;

use crate::domain::errors::CoordinatorResult;
use crate::domain::models::{Agent, AgentId, AgentStatus, SwarmId};

/// Filter criteria for listing agents.
#[derive(Debug, Clone, Default)]
pub struct AgentFilter {
    /// Restrict to a single swarm.
    pub swarm_id: Option<SwarmId>,
    /// Restrict to a single status.
    pub status: Option<AgentStatus>,
    /// Restrict to a single agent type.
    pub agent_type: Option<String>,
}

/// Repository interface for `Agent` persistence.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Creates a new agent.
    async fn create(&self, agent: &Agent) -> CoordinatorResult<()>;

    /// Fetches an agent by id.
    async fn get(&self, id: AgentId) -> CoordinatorResult<Option<Agent>>;

    /// Persists an updated agent (status, assignment, completion count).
    async fn update(&self, agent: &Agent) -> CoordinatorResult<()>;

    /// Lists agents matching the given filter.
    async fn list(&self, filter: AgentFilter) -> CoordinatorResult<Vec<Agent>>;

    /// Lists all idle agents in a swarm eligible for assignment, in no
    /// particular order (the Scheduler applies its own selection policy).
    async fn list_idle(&self, swarm_id: SwarmId) -> CoordinatorResult<Vec<Agent>>;

    /// Counts live (non-offline) agents in a swarm, grouped by agent type.
    async fn count_live_by_type(
        &self,
        swarm_id: SwarmId,
    ) -> CoordinatorResult<std::collections::HashMap<String, usize>>;
}
