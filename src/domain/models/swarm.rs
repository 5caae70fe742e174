//! The swarm entity: a single coordination session for one objective.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwarmId(pub Uuid);

impl SwarmId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SwarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SwarmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmStatus {
    /// Store/config prepared, but the Queen has not yet spawned; no
    /// agents exist. `topology` may still change.
    Initializing,
    /// Queen and initial workers are live, scheduling is active.
    Active,
    /// Scheduling suspended; existing assignments are left in place.
    Paused,
    /// `shutdown()` has been called; draining outstanding tasks.
    ShuttingDown,
    /// Fully shut down. Terminal.
    Terminated,
}

impl SwarmStatus {
    /// Returns the lowercase wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::ShuttingDown => "shutting_down",
            Self::Terminated => "terminated",
        }
    }

    /// Parses the wire representation back into a status.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "initializing" => Some(Self::Initializing),
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "shutting_down" => Some(Self::ShuttingDown),
            "terminated" => Some(Self::Terminated),
            _ => None,
        }
    }

    /// Whether `self -> to` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Initializing, Self::Active)
                | (Self::Active, Self::Paused)
                | (Self::Active, Self::ShuttingDown)
                | (Self::Paused, Self::Active)
                | (Self::Paused, Self::ShuttingDown)
                | (Self::ShuttingDown, Self::Terminated)
        )
    }
}

/// The Queen's authority model over a swarm's agents (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueenMode {
    /// The Queen makes all scheduling/consensus decisions directly.
    Centralized,
    /// Workers may negotiate assignments among themselves via the Bus.
    Distributed,
    /// The Queen sets policy; day-to-day dispatch is delegated.
    Strategic,
}

impl Default for QueenMode {
    fn default() -> Self {
        Self::Centralized
    }
}

impl QueenMode {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Centralized => "centralized",
            Self::Distributed => "distributed",
            Self::Strategic => "strategic",
        }
    }

    /// Parses the wire representation.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "centralized" => Some(Self::Centralized),
            "distributed" => Some(Self::Distributed),
            "strategic" => Some(Self::Strategic),
            _ => None,
        }
    }
}

/// The Queen topology selected for a swarm, chosen from the objective text
/// (§4.7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Single queen, flat worker pool. Default when no keyword matches.
    Hierarchical,
    /// Worker-to-worker handoffs without central routing. Research/analysis
    /// objectives.
    Mesh,
    /// Agents hand off work in a fixed cycle. Monitor/maintain objectives.
    Ring,
    /// Queen routes every message; workers never talk directly.
    /// Coordinate/orchestrate objectives.
    Star,
}

impl Topology {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hierarchical => "hierarchical",
            Self::Mesh => "mesh",
            Self::Ring => "ring",
            Self::Star => "star",
        }
    }

    /// Parses the wire representation.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "hierarchical" => Some(Self::Hierarchical),
            "mesh" => Some(Self::Mesh),
            "ring" => Some(Self::Ring),
            "star" => Some(Self::Star),
            _ => None,
        }
    }

    /// Chooses a topology from objective text by keyword heuristic
    /// (§4.7.1): research/analysis → mesh; build/develop → hierarchical;
    /// monitor/maintain → ring; coordinate/orchestrate → star; default
    /// hierarchical.
    #[must_use]
    pub fn from_objective(text: &str) -> Self {
        let text = text.to_lowercase();
        if text.contains("research") || text.contains("analysis") || text.contains("analyze") {
            Self::Mesh
        } else if text.contains("monitor") || text.contains("maintain") {
            Self::Ring
        } else if text.contains("coordinate") || text.contains("orchestrate") {
            Self::Star
        } else {
            Self::Hierarchical
        }
    }
}

/// A swarm: the top-level unit of coordination for one objective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swarm {
    /// Unique identifier.
    pub id: SwarmId,
    /// Human-assigned label, defaults to the objective's first words.
    pub name: String,
    /// The natural-language objective the swarm was spawned to pursue.
    pub objective: String,
    /// Topology chosen by the Queen at spawn time. Immutable once the
    /// swarm leaves `initializing`.
    pub topology: Topology,
    /// The Queen's authority model over this swarm's agents.
    pub queen_mode: QueenMode,
    /// Current lifecycle state.
    pub status: SwarmStatus,
    /// Upper bound on simultaneously live agents for this swarm.
    pub max_agents: usize,
    /// When the swarm was created.
    pub created_at: DateTime<Utc>,
    /// When the swarm's state was last changed.
    pub updated_at: DateTime<Utc>,
    /// When the swarm reached `terminated`, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Swarm {
    /// Builds a new swarm in `initializing` status: Store/config prepared
    /// but no Queen or workers spawned yet. `activate` flips it `active`
    /// once the Queen has seeded the initial worker set.
    #[must_use]
    pub fn new(objective: impl Into<String>, topology: Topology, max_agents: usize) -> Self {
        let objective = objective.into();
        let name = objective.split_whitespace().take(6).collect::<Vec<_>>().join(" ");
        let now = Utc::now();
        Self {
            id: SwarmId::new(),
            name,
            objective,
            topology,
            queen_mode: QueenMode::default(),
            status: SwarmStatus::Initializing,
            max_agents,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Builder: overrides the derived name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: overrides the default queen mode.
    #[must_use]
    pub const fn with_queen_mode(mut self, queen_mode: QueenMode) -> Self {
        self.queen_mode = queen_mode;
        self
    }

    /// Flips `initializing -> active` once the Queen has spawned its
    /// initial worker set.
    pub fn activate(&mut self) {
        self.status = SwarmStatus::Active;
        self.updated_at = Utc::now();
    }

    /// Suspends scheduling (`active -> paused`).
    pub fn pause(&mut self) {
        self.status = SwarmStatus::Paused;
        self.updated_at = Utc::now();
    }

    /// Resumes scheduling (`paused -> active`).
    pub fn resume(&mut self) {
        self.status = SwarmStatus::Active;
        self.updated_at = Utc::now();
    }

    /// Begins an orderly shutdown (`active|paused -> shutting_down`).
    pub fn begin_shutdown(&mut self) {
        self.status = SwarmStatus::ShuttingDown;
        self.updated_at = Utc::now();
    }

    /// Marks the swarm fully terminated (`shutting_down -> terminated`).
    pub fn terminate(&mut self) {
        self.status = SwarmStatus::Terminated;
        let now = Utc::now();
        self.updated_at = now;
        self.completed_at = Some(now);
    }
}
