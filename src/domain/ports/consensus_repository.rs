//! Consensus proposal repository port.

use async_trait::async_trait;

use crate::domain::errors::CoordinatorResult;
use crate::domain::models::{Proposal, ProposalId, ProposalStatus, SwarmId};

/// Repository interface for `Proposal` persistence.
#[async_trait]
pub trait ConsensusRepository: Send + Sync {
    /// Creates a new proposal.
    async fn create(&self, proposal: &Proposal) -> CoordinatorResult<()>;

    /// Fetches a proposal by id.
    async fn get(&self, id: ProposalId) -> CoordinatorResult<Option<Proposal>>;

    /// Persists an updated proposal (votes cast, status, result).
    async fn update(&self, proposal: &Proposal) -> CoordinatorResult<()>;

    /// Lists proposals in a swarm, optionally filtered by status.
    async fn list(
        &self,
        swarm_id: SwarmId,
        status: Option<ProposalStatus>,
    ) -> CoordinatorResult<Vec<Proposal>>;

    /// Lists proposals still open past their deadline, for the
    /// deadline-enforcement tick (§4.6.1).
    async fn list_expired_open(&self) -> CoordinatorResult<Vec<Proposal>>;
}
