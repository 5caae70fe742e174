//! Agent domain model.
//!
//! An agent is one worker instance inside a swarm's bounded pool. Its role
//! (`queen` or `worker`) is fixed at spawn time; its status tracks the
//! invariant `status = busy <=> current_task_id.is_some()` enforced by the
//! Scheduler and Agent Pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::capability::Capability;
use super::swarm::SwarmId;
use super::task::TaskId;

/// Identifies an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub Uuid);

impl AgentId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An agent's place in the swarm hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// The single coordinating agent for a swarm.
    Queen,
    /// An ordinary pool worker.
    Worker,
}

impl AgentRole {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queen => "queen",
            Self::Worker => "worker",
        }
    }

    /// Parses the wire representation.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "queen" => Some(Self::Queen),
            "worker" => Some(Self::Worker),
            _ => None,
        }
    }
}

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// No task assigned, eligible for scheduling.
    Idle,
    /// Has a task assigned but has not yet begun executing it.
    Busy,
    /// Executing an assigned task.
    Active,
    /// The agent's last task ended in an error; awaiting recovery.
    Error,
    /// Retired; will not be scheduled again.
    Offline,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl AgentStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Active => "active",
            Self::Error => "error",
            Self::Offline => "offline",
        }
    }

    /// Parses the wire representation.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "busy" => Some(Self::Busy),
            "active" => Some(Self::Active),
            "error" => Some(Self::Error),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }

    /// Valid transitions from this status, per the state machine in the
    /// component design for the Agent Pool.
    #[must_use]
    pub const fn valid_transitions(self) -> &'static [Self] {
        match self {
            Self::Idle => &[Self::Busy, Self::Offline],
            Self::Busy => &[Self::Active, Self::Idle, Self::Error],
            Self::Active => &[Self::Idle, Self::Error],
            Self::Error => &[Self::Offline, Self::Idle],
            Self::Offline => &[],
        }
    }

    /// Whether `self -> to` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Whether this agent can currently be handed a new task.
    #[must_use]
    pub const fn is_schedulable(self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// A worker instance inside a swarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier.
    pub id: AgentId,
    /// Owning swarm.
    pub swarm_id: SwarmId,
    /// Hierarchy role.
    pub role: AgentRole,
    /// Agent type name, as registered in the swarm's capability catalog.
    pub agent_type: String,
    /// Current lifecycle status.
    pub status: AgentStatus,
    /// Capabilities this agent instance offers.
    pub capabilities: HashSet<Capability>,
    /// The task currently assigned, if any. `Some` iff `status == Busy`
    /// or `status == Active`.
    pub current_task_id: Option<TaskId>,
    /// Count of tasks this agent has completed successfully.
    pub tasks_completed: u64,
    /// When the agent was spawned.
    pub created_at: DateTime<Utc>,
    /// When the agent last changed status.
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Spawns a new idle agent.
    #[must_use]
    pub fn new(
        swarm_id: SwarmId,
        role: AgentRole,
        agent_type: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::new(),
            swarm_id,
            role,
            agent_type: agent_type.into(),
            status: AgentStatus::Idle,
            capabilities: capabilities.into_iter().collect(),
            current_task_id: None,
            tasks_completed: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Assigns a task: `idle -> busy`, sets `current_task_id`.
    ///
    /// Returns `false` without mutating state if the agent is not idle.
    pub fn assign_task(&mut self, task_id: TaskId) -> bool {
        if !self.status.is_schedulable() {
            return false;
        }
        self.status = AgentStatus::Busy;
        self.current_task_id = Some(task_id);
        self.updated_at = Utc::now();
        true
    }

    /// Marks the agent as actively executing its assigned task
    /// (`busy -> active`).
    pub fn start_task(&mut self) -> bool {
        if self.status != AgentStatus::Busy {
            return false;
        }
        self.status = AgentStatus::Active;
        self.updated_at = Utc::now();
        true
    }

    /// Completes the current task: `active|busy -> idle`, clears
    /// `current_task_id`, increments the completion counter.
    pub fn complete_task(&mut self) {
        self.status = AgentStatus::Idle;
        self.current_task_id = None;
        self.tasks_completed += 1;
        self.updated_at = Utc::now();
    }

    /// Marks the agent's current task as errored (`busy|active -> error`).
    pub fn error_task(&mut self) {
        self.status = AgentStatus::Error;
        self.updated_at = Utc::now();
    }

    /// Recovers from error back to idle, clearing any stale task
    /// assignment (`error -> idle`).
    pub fn recover(&mut self) {
        self.status = AgentStatus::Idle;
        self.current_task_id = None;
        self.updated_at = Utc::now();
    }

    /// Retires the agent permanently (`* -> offline`).
    pub fn retire(&mut self) {
        self.status = AgentStatus::Offline;
        self.current_task_id = None;
        self.updated_at = Utc::now();
    }

    /// Checks the core invariant: `status=busy|active <=> current_task_id
    /// is some`.
    #[must_use]
    pub const fn invariant_holds(&self) -> bool {
        match self.status {
            AgentStatus::Busy | AgentStatus::Active => self.current_task_id.is_some(),
            AgentStatus::Idle | AgentStatus::Error | AgentStatus::Offline => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_agent() -> Agent {
        Agent::new(SwarmId::new(), AgentRole::Worker, "coder", [])
    }

    #[test]
    fn status_round_trips_through_wire_form() {
        for s in [
            AgentStatus::Idle,
            AgentStatus::Busy,
            AgentStatus::Active,
            AgentStatus::Error,
            AgentStatus::Offline,
        ] {
            assert_eq!(AgentStatus::parse_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn offline_is_terminal() {
        assert!(AgentStatus::Offline.valid_transitions().is_empty());
    }

    #[test]
    fn assign_task_sets_busy_and_current_task() {
        let mut agent = test_agent();
        let task = TaskId::new();
        assert!(agent.assign_task(task));
        assert_eq!(agent.status, AgentStatus::Busy);
        assert_eq!(agent.current_task_id, Some(task));
        assert!(agent.invariant_holds());
    }

    #[test]
    fn cannot_assign_task_to_a_busy_agent() {
        let mut agent = test_agent();
        agent.assign_task(TaskId::new());
        assert!(!agent.assign_task(TaskId::new()));
    }

    #[test]
    fn complete_task_clears_assignment_and_returns_to_idle() {
        let mut agent = test_agent();
        agent.assign_task(TaskId::new());
        agent.start_task();
        agent.complete_task();
        assert_eq!(agent.status, AgentStatus::Idle);
        assert_eq!(agent.current_task_id, None);
        assert_eq!(agent.tasks_completed, 1);
        assert!(agent.invariant_holds());
    }

    #[test]
    fn error_then_offline_drops_current_task() {
        let mut agent = test_agent();
        agent.assign_task(TaskId::new());
        agent.error_task();
        assert_eq!(agent.status, AgentStatus::Error);
        agent.retire();
        assert_eq!(agent.status, AgentStatus::Offline);
        assert_eq!(agent.current_task_id, None);
    }
}
