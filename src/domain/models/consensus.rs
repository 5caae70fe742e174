//! Consensus domain model: proposals and votes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::agent::AgentId;
use super::swarm::SwarmId;

/// Identifies a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub Uuid);

impl ProposalId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The vote-tallying algorithm applied when a proposal's deadline passes
/// or all eligible voters have voted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusAlgorithm {
    /// Plain majority of cast votes wins.
    Majority,
    /// The queen's vote counts three times; plurality of weighted votes wins.
    Weighted,
    /// Requires at least two-thirds agreement; otherwise no consensus.
    Byzantine,
}

impl ConsensusAlgorithm {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Majority => "majority",
            Self::Weighted => "weighted",
            Self::Byzantine => "byzantine",
        }
    }

    /// Parses the wire representation.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "majority" => Some(Self::Majority),
            "weighted" => Some(Self::Weighted),
            "byzantine" => Some(Self::Byzantine),
            _ => None,
        }
    }
}

/// Lifecycle status of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Open for votes.
    Open,
    /// A decision was reached (majority/weighted/byzantine threshold met).
    Decided,
    /// The deadline passed without reaching the required threshold or
    /// participation floor.
    TimedOut,
}

impl ProposalStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Decided => "decided",
            Self::TimedOut => "timed_out",
        }
    }

    /// Parses the wire representation.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "decided" => Some(Self::Decided),
            "timed_out" => Some(Self::TimedOut),
            _ => None,
        }
    }
}

/// A single cast vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    /// The voting agent.
    pub agent_id: AgentId,
    /// The option chosen, one of `Proposal::options`.
    pub option: String,
    /// When the vote was cast.
    pub cast_at: DateTime<Utc>,
}

/// The outcome of tallying a proposal's votes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// The winning option, if any was reached.
    pub winning_option: Option<String>,
    /// Confidence in `[0.0, 1.0]` per the algorithm's formula. `0.0` when
    /// no consensus was reached.
    pub confidence: f64,
    /// Final status after tallying.
    pub status: ProposalStatus,
}

/// A proposal put to a swarm's agents for a vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique identifier.
    pub id: ProposalId,
    /// Owning swarm.
    pub swarm_id: SwarmId,
    /// Human-readable description of the decision being made.
    pub description: String,
    /// The set of options agents may vote for.
    pub options: Vec<String>,
    /// Tallying algorithm to apply.
    pub algorithm: ConsensusAlgorithm,
    /// Agents eligible to vote.
    pub eligible_voters: Vec<AgentId>,
    /// Votes cast so far, one per voting agent.
    pub votes: HashMap<AgentId, Vote>,
    /// Current lifecycle status.
    pub status: ProposalStatus,
    /// Tallied result, set once `status != Open`.
    pub result: Option<ConsensusResult>,
    /// When voting must conclude by.
    pub deadline: DateTime<Utc>,
    /// When the proposal was created.
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    /// Opens a new proposal.
    #[must_use]
    pub fn new(
        swarm_id: SwarmId,
        description: impl Into<String>,
        options: Vec<String>,
        algorithm: ConsensusAlgorithm,
        eligible_voters: Vec<AgentId>,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProposalId::new(),
            swarm_id,
            description: description.into(),
            options,
            algorithm,
            eligible_voters,
            votes: HashMap::new(),
            status: ProposalStatus::Open,
            result: None,
            deadline,
            created_at: Utc::now(),
        }
    }

    /// Records a vote from `agent_id`, overwriting any prior vote from the
    /// same agent. No-op if the proposal is no longer open or the agent
    /// isn't eligible.
    pub fn cast_vote(&mut self, agent_id: AgentId, option: String) -> bool {
        if self.status != ProposalStatus::Open || !self.eligible_voters.contains(&agent_id) {
            return false;
        }
        self.votes.insert(
            agent_id,
            Vote {
                agent_id,
                option,
                cast_at: Utc::now(),
            },
        );
        true
    }

    /// Fraction of eligible voters who have cast a vote.
    #[must_use]
    pub fn participation(&self) -> f64 {
        if self.eligible_voters.is_empty() {
            return 0.0;
        }
        self.votes.len() as f64 / self.eligible_voters.len() as f64
    }

    /// All eligible voters have voted.
    #[must_use]
    pub fn all_voted(&self) -> bool {
        self.votes.len() >= self.eligible_voters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_proposal(algorithm: ConsensusAlgorithm, voters: usize) -> Proposal {
        let eligible = (0..voters).map(|_| AgentId::new()).collect();
        Proposal::new(
            SwarmId::new(),
            "pick one",
            vec!["a".into(), "b".into()],
            algorithm,
            eligible,
            Utc::now() + Duration::seconds(30),
        )
    }

    #[test]
    fn vote_from_ineligible_agent_is_rejected() {
        let mut proposal = test_proposal(ConsensusAlgorithm::Majority, 3);
        assert!(!proposal.cast_vote(AgentId::new(), "a".into()));
    }

    #[test]
    fn vote_from_eligible_agent_is_recorded_once_per_agent() {
        let mut proposal = test_proposal(ConsensusAlgorithm::Majority, 1);
        let voter = proposal.eligible_voters[0];
        assert!(proposal.cast_vote(voter, "a".into()));
        assert!(proposal.cast_vote(voter, "b".into()));
        assert_eq!(proposal.votes.len(), 1);
        assert_eq!(proposal.votes[&voter].option, "b");
    }

    #[test]
    fn participation_tracks_fraction_of_eligible_voters() {
        let mut proposal = test_proposal(ConsensusAlgorithm::Majority, 4);
        let voter = proposal.eligible_voters[0];
        proposal.cast_vote(voter, "a".into());
        assert!((proposal.participation() - 0.25).abs() < f64::EPSILON);
        assert!(!proposal.all_voted());
    }
}
