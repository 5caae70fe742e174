//! In-memory `ConsensusRepository` fallback.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{Proposal, ProposalId, ProposalStatus, SwarmId};
use crate::domain::ports::ConsensusRepository;

#[derive(Default)]
pub struct InMemoryConsensusRepository {
    proposals: RwLock<HashMap<ProposalId, Proposal>>,
}

impl InMemoryConsensusRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsensusRepository for InMemoryConsensusRepository {
    async fn create(&self, proposal: &Proposal) -> CoordinatorResult<()> {
        self.proposals.write().insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn get(&self, id: ProposalId) -> CoordinatorResult<Option<Proposal>> {
        Ok(self.proposals.read().get(&id).cloned())
    }

    async fn update(&self, proposal: &Proposal) -> CoordinatorResult<()> {
        let mut proposals = self.proposals.write();
        if !proposals.contains_key(&proposal.id) {
            return Err(CoordinatorError::UnknownEntity {
                kind: "proposal",
                id: proposal.id.to_string(),
            });
        }
        proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn list(
        &self,
        swarm_id: SwarmId,
        status: Option<ProposalStatus>,
    ) -> CoordinatorResult<Vec<Proposal>> {
        let out = self
            .proposals
            .read()
            .values()
            .filter(|p| p.swarm_id == swarm_id)
            .filter(|p| status.is_none_or(|want| p.status == want))
            .cloned()
            .collect();
        Ok(out)
    }

    async fn list_expired_open(&self) -> CoordinatorResult<Vec<Proposal>> {
        let now = Utc::now();
        let out = self
            .proposals
            .read()
            .values()
            .filter(|p| p.status == ProposalStatus::Open && p.deadline <= now)
            .cloned()
            .collect();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AgentId, ConsensusAlgorithm};
    use chrono::Duration;

    #[tokio::test]
    async fn list_expired_open_finds_past_deadline() {
        let repo = InMemoryConsensusRepository::new();
        let swarm_id = SwarmId::new();
        let expired = Proposal::new(
            swarm_id,
            "stale",
            vec!["a".into()],
            ConsensusAlgorithm::Majority,
            vec![AgentId::new()],
            Utc::now() - Duration::seconds(5),
        );
        repo.create(&expired).await.unwrap();
        assert_eq!(repo.list_expired_open().await.unwrap().len(), 1);
    }
}
