//! In-memory `AgentRepository` fallback.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{Agent, AgentId, AgentStatus, SwarmId};
use crate::domain::ports::{AgentFilter, AgentRepository};

#[derive(Default)]
pub struct InMemoryAgentRepository {
    agents: RwLock<HashMap<AgentId, Agent>>,
}

impl InMemoryAgentRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn create(&self, agent: &Agent) -> CoordinatorResult<()> {
        self.agents.write().insert(agent.id, agent.clone());
        Ok(())
    }

    async fn get(&self, id: AgentId) -> CoordinatorResult<Option<Agent>> {
        Ok(self.agents.read().get(&id).cloned())
    }

    async fn update(&self, agent: &Agent) -> CoordinatorResult<()> {
        let mut agents = self.agents.write();
        if !agents.contains_key(&agent.id) {
            return Err(CoordinatorError::UnknownEntity {
                kind: "agent",
                id: agent.id.to_string(),
            });
        }
        agents.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn list(&self, filter: AgentFilter) -> CoordinatorResult<Vec<Agent>> {
        let out = self
            .agents
            .read()
            .values()
            .filter(|a| filter.swarm_id.is_none_or(|want| a.swarm_id == want))
            .filter(|a| filter.status.is_none_or(|want| a.status == want))
            .filter(|a| {
                filter
                    .agent_type
                    .as_ref()
                    .is_none_or(|want| &a.agent_type == want)
            })
            .cloned()
            .collect();
        Ok(out)
    }

    async fn list_idle(&self, swarm_id: SwarmId) -> CoordinatorResult<Vec<Agent>> {
        let out = self
            .agents
            .read()
            .values()
            .filter(|a| a.swarm_id == swarm_id && a.status == AgentStatus::Idle)
            .cloned()
            .collect();
        Ok(out)
    }

    async fn count_live_by_type(
        &self,
        swarm_id: SwarmId,
    ) -> CoordinatorResult<HashMap<String, usize>> {
        let mut counts = HashMap::new();
        for agent in self.agents.read().values() {
            if agent.swarm_id == swarm_id && agent.status != AgentStatus::Offline {
                *counts.entry(agent.agent_type.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AgentRole;

    #[tokio::test]
    async fn list_idle_excludes_busy_agents() {
        let repo = InMemoryAgentRepository::new();
        let swarm_id = SwarmId::new();
        let mut busy = Agent::new(swarm_id, AgentRole::Worker, "coder", []);
        busy.assign_task(crate::domain::models::TaskId::new());
        let idle = Agent::new(swarm_id, AgentRole::Worker, "reviewer", []);

        repo.create(&busy).await.unwrap();
        repo.create(&idle).await.unwrap();

        let idle_agents = repo.list_idle(swarm_id).await.unwrap();
        assert_eq!(idle_agents.len(), 1);
    }

    #[tokio::test]
    async fn update_unknown_agent_errors() {
        let repo = InMemoryAgentRepository::new();
        let agent = Agent::new(SwarmId::new(), AgentRole::Worker, "ghost", []);
        assert!(repo.update(&agent).await.is_err());
    }
}
