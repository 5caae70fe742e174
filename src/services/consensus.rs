//! Consensus: proposal lifecycle and the three vote-tallying algorithms
//! (§4.6).
//!
//! Deadline enforcement is a tick the Coordinator drives alongside the
//! Scheduler's dispatch loop rather than a per-proposal timer, so every
//! suspension point in the process shares the one cancellation path
//! (§4.6.1, §5.1).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{
    AgentId, ConsensusAlgorithm, ConsensusConfig, ConsensusResult, Proposal, ProposalId,
    ProposalStatus, SwarmId, SystemEvent,
};
use crate::domain::ports::ConsensusRepository;
use crate::services::event_bus::EventBus;

/// The Queen's voter id, whose ballot is weighted 3x under
/// `ConsensusAlgorithm::Weighted` (§4.6).
const WEIGHTED_QUEEN_VOTES: u32 = 3;
const WEIGHTED_OTHER_VOTES: u32 = 1;
const BYZANTINE_THRESHOLD: f64 = 2.0 / 3.0;

/// Runs proposal lifecycle and vote tallying for one swarm.
pub struct Consensus {
    proposals: Arc<dyn ConsensusRepository>,
    events: Arc<EventBus>,
    config: ConsensusConfig,
}

impl Consensus {
    /// Builds a consensus service over `proposals`, publishing outcomes on
    /// `events`.
    #[must_use]
    pub fn new(proposals: Arc<dyn ConsensusRepository>, events: Arc<EventBus>, config: ConsensusConfig) -> Self {
        Self {
            proposals,
            events,
            config,
        }
    }

    /// Opens a new proposal (§4.6: `propose`).
    #[instrument(skip(self, description, options))]
    pub async fn propose(
        &self,
        swarm_id: SwarmId,
        description: impl Into<String>,
        options: Vec<String>,
        algorithm: ConsensusAlgorithm,
        eligible_voters: Vec<AgentId>,
        deadline: DateTime<Utc>,
    ) -> CoordinatorResult<ProposalId> {
        if options.is_empty() {
            return Err(CoordinatorError::InvalidRequest(
                "a proposal must offer at least one option".into(),
            ));
        }
        if eligible_voters.is_empty() {
            return Err(CoordinatorError::InvalidRequest(
                "a proposal must have at least one eligible voter".into(),
            ));
        }

        let proposal = Proposal::new(swarm_id, description, options, algorithm, eligible_voters, deadline);
        let id = proposal.id;
        self.proposals.create(&proposal).await?;
        self.events.publish(SystemEvent::DecisionOpen {
            swarm_id,
            proposal_id: id,
        });
        Ok(id)
    }

    /// Records a vote (§4.6: `vote`). Choices outside the proposal's
    /// `options` are rejected; the proposal closes immediately (without
    /// waiting for the deadline) once every eligible voter has voted.
    #[instrument(skip(self, choice))]
    pub async fn vote(&self, proposal_id: ProposalId, voter: AgentId, choice: String) -> CoordinatorResult<()> {
        let mut proposal = self
            .proposals
            .get(proposal_id)
            .await?
            .ok_or_else(|| CoordinatorError::UnknownEntity {
                kind: "proposal",
                id: proposal_id.to_string(),
            })?;

        if !proposal.options.contains(&choice) {
            return Err(CoordinatorError::InvalidRequest(format!(
                "'{choice}' is not one of this proposal's options"
            )));
        }

        if !proposal.cast_vote(voter, choice) {
            return Err(CoordinatorError::InvalidRequest(format!(
                "agent {voter} is not eligible to vote on this proposal, or it is no longer open"
            )));
        }

        let all_voted = proposal.all_voted();
        self.proposals.update(&proposal).await?;

        if all_voted {
            self.close(proposal).await?;
        }
        Ok(())
    }

    /// One deadline-enforcement tick (§4.6.1): closes every `open`
    /// proposal whose deadline has elapsed. Returns the number closed.
    #[instrument(skip(self))]
    pub async fn enforce_deadlines(&self) -> CoordinatorResult<usize> {
        let expired = self.proposals.list_expired_open().await?;
        let count = expired.len();
        for proposal in expired {
            self.close(proposal).await?;
        }
        Ok(count)
    }

    /// Tallies and persists a proposal's outcome, applying the
    /// participation floor before the algorithm, then publishes
    /// `decision_closed`.
    async fn close(&self, mut proposal: Proposal) -> CoordinatorResult<()> {
        let result = if proposal.participation() < self.config.participation_floor {
            ConsensusResult {
                winning_option: None,
                confidence: 0.0,
                status: ProposalStatus::TimedOut,
            }
        } else {
            tally(&proposal)
        };

        proposal.status = result.status;
        proposal.result = Some(result.clone());
        self.proposals.update(&proposal).await?;

        self.events.publish(SystemEvent::DecisionClosed {
            swarm_id: proposal.swarm_id,
            proposal_id: proposal.id,
            status: proposal.status.as_str(),
        });
        info!(proposal_id = %proposal.id, status = proposal.status.as_str(), confidence = result.confidence, "proposal closed");
        Ok(())
    }

    /// Runs the deadline-enforcement tick until `cancellation` fires.
    pub async fn run(self: Arc<Self>, tick: std::time::Duration, cancellation: CancellationToken) {
        loop {
            tokio::select! {
                () = cancellation.cancelled() => {
                    info!("consensus deadline tick shutting down");
                    return;
                }
                () = tokio::time::sleep(tick) => {}
            }

            if let Err(err) = self.enforce_deadlines().await {
                warn!(error = %err, "deadline enforcement pass failed");
            }
        }
    }
}

/// Applies `proposal.algorithm` to its cast votes (§4.6).
fn tally(proposal: &Proposal) -> ConsensusResult {
    match proposal.algorithm {
        ConsensusAlgorithm::Majority => tally_majority(proposal),
        ConsensusAlgorithm::Weighted => tally_weighted(proposal),
        ConsensusAlgorithm::Byzantine => tally_byzantine(proposal),
    }
}

/// Decision = option with the strictly largest tally, ties broken by
/// option declaration order. `confidence = top_tally / total_votes`.
fn tally_majority(proposal: &Proposal) -> ConsensusResult {
    let tallies = raw_tallies(proposal);
    let total = proposal.votes.len() as f64;
    if total == 0.0 {
        return no_consensus();
    }
    let Some((winner, top)) = top_option(proposal, &tallies) else {
        return no_consensus();
    };
    ConsensusResult {
        winning_option: Some(winner),
        confidence: f64::from(top) / total,
        status: ProposalStatus::Decided,
    }
}

/// The designated queen voter contributes `WEIGHTED_QUEEN_VOTES`, all
/// others contribute `WEIGHTED_OTHER_VOTES`; plurality of weighted votes
/// wins. `confidence = weighted_top / (total_votes + 2)` — the `+2`
/// accounts for the queen's extra two votes on top of her own single
/// vote, matching the stated formula literally.
fn tally_weighted_with_queen(proposal: &Proposal, queen: Option<AgentId>) -> ConsensusResult {
    let mut tallies: HashMap<&str, u32> = HashMap::new();
    for vote in proposal.votes.values() {
        let weight = if Some(vote.agent_id) == queen {
            WEIGHTED_QUEEN_VOTES
        } else {
            WEIGHTED_OTHER_VOTES
        };
        *tallies.entry(vote.option.as_str()).or_insert(0) += weight;
    }

    let total_votes = proposal.votes.len() as f64;
    if total_votes == 0.0 {
        return no_consensus();
    }

    let winner = proposal
        .options
        .iter()
        .map(|opt| (opt.clone(), *tallies.get(opt.as_str()).unwrap_or(&0)))
        .max_by_key(|(_, tally)| *tally);

    match winner {
        Some((option, top)) if top > 0 => ConsensusResult {
            winning_option: Some(option),
            confidence: f64::from(top) / (total_votes + 2.0),
            status: ProposalStatus::Decided,
        },
        _ => no_consensus(),
    }
}

/// Weighted tallying using the first eligible voter as the queen
/// designee, matching the common case of a single-queen swarm where the
/// queen is always the first agent added to `eligible_voters`.
fn tally_weighted(proposal: &Proposal) -> ConsensusResult {
    let queen = proposal.eligible_voters.first().copied();
    tally_weighted_with_queen(proposal, queen)
}

/// Requires `top_tally / total_votes >= 2/3`; otherwise `no_consensus`
/// with confidence `0.0`.
fn tally_byzantine(proposal: &Proposal) -> ConsensusResult {
    let tallies = raw_tallies(proposal);
    let total = proposal.votes.len() as f64;
    if total == 0.0 {
        return no_consensus();
    }
    let Some((winner, top)) = top_option(proposal, &tallies) else {
        return no_consensus();
    };
    let confidence = f64::from(top) / total;
    if confidence >= BYZANTINE_THRESHOLD {
        ConsensusResult {
            winning_option: Some(winner),
            confidence,
            status: ProposalStatus::Decided,
        }
    } else {
        no_consensus()
    }
}

fn raw_tallies(proposal: &Proposal) -> HashMap<&str, u32> {
    let mut tallies: HashMap<&str, u32> = HashMap::new();
    for vote in proposal.votes.values() {
        *tallies.entry(vote.option.as_str()).or_insert(0) += 1;
    }
    tallies
}

/// The option with the strictly largest tally, ties broken by the
/// proposal's declared option order.
fn top_option(proposal: &Proposal, tallies: &HashMap<&str, u32>) -> Option<(String, u32)> {
    proposal
        .options
        .iter()
        .map(|opt| (opt.clone(), *tallies.get(opt.as_str()).unwrap_or(&0)))
        .filter(|(_, tally)| *tally > 0)
        .max_by_key(|(_, tally)| *tally)
}

const fn no_consensus() -> ConsensusResult {
    ConsensusResult {
        winning_option: None,
        confidence: 0.0,
        status: ProposalStatus::Decided,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryConsensusRepository;
    use chrono::Duration;

    fn consensus() -> (Arc<Consensus>, Arc<InMemoryConsensusRepository>) {
        let repo = Arc::new(InMemoryConsensusRepository::new());
        let consensus = Arc::new(Consensus::new(
            repo.clone(),
            Arc::new(EventBus::new()),
            ConsensusConfig::default(),
        ));
        (consensus, repo)
    }

    #[tokio::test]
    async fn propose_rejects_empty_options() {
        let (consensus, _repo) = consensus();
        let result = consensus
            .propose(
                SwarmId::new(),
                "pick one",
                vec![],
                ConsensusAlgorithm::Majority,
                vec![AgentId::new()],
                Utc::now() + Duration::seconds(30),
            )
            .await;
        assert!(matches!(result, Err(CoordinatorError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn vote_outside_the_option_set_is_rejected() {
        let (consensus, _repo) = consensus();
        let voter = AgentId::new();
        let id = consensus
            .propose(
                SwarmId::new(),
                "pick one",
                vec!["a".into(), "b".into()],
                ConsensusAlgorithm::Majority,
                vec![voter],
                Utc::now() + Duration::seconds(30),
            )
            .await
            .unwrap();

        assert!(matches!(
            consensus.vote(id, voter, "c".into()).await,
            Err(CoordinatorError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn majority_decides_once_all_eligible_voters_have_voted() {
        let (consensus, repo) = consensus();
        let voters: Vec<AgentId> = (0..3).map(|_| AgentId::new()).collect();
        let id = consensus
            .propose(
                SwarmId::new(),
                "pick one",
                vec!["a".into(), "b".into()],
                ConsensusAlgorithm::Majority,
                voters.clone(),
                Utc::now() + Duration::seconds(30),
            )
            .await
            .unwrap();

        consensus.vote(id, voters[0], "a".into()).await.unwrap();
        consensus.vote(id, voters[1], "a".into()).await.unwrap();
        consensus.vote(id, voters[2], "b".into()).await.unwrap();

        let proposal = repo.get(id).await.unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::Decided);
        let result = proposal.result.unwrap();
        assert_eq!(result.winning_option, Some("a".into()));
        assert!((result.confidence - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn weighted_queen_vote_outweighs_two_worker_votes() {
        let (consensus, repo) = consensus();
        let queen = AgentId::new();
        let workers: Vec<AgentId> = (0..2).map(|_| AgentId::new()).collect();
        let mut voters = vec![queen];
        voters.extend(workers.iter().copied());

        let id = consensus
            .propose(
                SwarmId::new(),
                "pick one",
                vec!["a".into(), "b".into()],
                ConsensusAlgorithm::Weighted,
                voters,
                Utc::now() + Duration::seconds(30),
            )
            .await
            .unwrap();

        consensus.vote(id, queen, "a".into()).await.unwrap();
        consensus.vote(id, workers[0], "b".into()).await.unwrap();
        consensus.vote(id, workers[1], "b".into()).await.unwrap();

        let proposal = repo.get(id).await.unwrap().unwrap();
        let result = proposal.result.unwrap();
        assert_eq!(result.winning_option, Some("a".into()));
    }

    #[tokio::test]
    async fn byzantine_requires_two_thirds_agreement() {
        let (consensus, repo) = consensus();
        let voters: Vec<AgentId> = (0..3).map(|_| AgentId::new()).collect();
        let id = consensus
            .propose(
                SwarmId::new(),
                "pick one",
                vec!["a".into(), "b".into()],
                ConsensusAlgorithm::Byzantine,
                voters.clone(),
                Utc::now() + Duration::seconds(30),
            )
            .await
            .unwrap();

        consensus.vote(id, voters[0], "a".into()).await.unwrap();
        consensus.vote(id, voters[1], "b".into()).await.unwrap();
        consensus.vote(id, voters[2], "b".into()).await.unwrap();

        let proposal = repo.get(id).await.unwrap().unwrap();
        let result = proposal.result.unwrap();
        assert_eq!(result.winning_option, None);
        assert!((result.confidence - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn low_participation_times_out_at_the_deadline_regardless_of_algorithm() {
        let (consensus, repo) = consensus();
        let voters: Vec<AgentId> = (0..4).map(|_| AgentId::new()).collect();
        let id = consensus
            .propose(
                SwarmId::new(),
                "pick one",
                vec!["a".into(), "b".into()],
                ConsensusAlgorithm::Majority,
                voters.clone(),
                Utc::now() - Duration::seconds(1),
            )
            .await
            .unwrap();
        consensus.vote(id, voters[0], "a".into()).await.unwrap();

        let closed = consensus.enforce_deadlines().await.unwrap();
        assert_eq!(closed, 1);

        let proposal = repo.get(id).await.unwrap().unwrap();
        assert_eq!(proposal.status, ProposalStatus::TimedOut);
    }
}
