//! Task domain model.
//!
//! Tasks are discrete units of work submitted against a swarm. They form a
//! DAG through `dependencies`, carry a required-capability set the
//! Scheduler uses to pick an agent type, and an optional consensus
//! requirement checked before the task is marked complete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::capability::Capability;
use super::swarm::SwarmId;

/// Default retry budget for a newly created task (§4.5 step 8).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Identifies a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a task in the execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Submitted, waiting on dependencies or a free agent slot.
    Pending,
    /// Assigned to one or more agents but not yet started.
    Assigned,
    /// At least one assigned agent has started executing the task.
    InProgress,
    /// Finished successfully (and passed consensus, if required).
    Completed,
    /// Finished unsuccessfully, or rejected by consensus.
    Failed,
    /// Cancelled by the caller before completion.
    Cancelled,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses the wire representation.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "assigned" => Some(Self::Assigned),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether this is a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Valid transitions from this status.
    #[must_use]
    pub const fn valid_transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Assigned, Self::Cancelled],
            Self::Assigned => &[Self::InProgress, Self::Pending, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => &[],
        }
    }

    /// Whether `self -> to` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.valid_transitions().contains(&to)
    }
}

/// Priority level for tasks. The discriminant is the scheduling rank used
/// directly by the ready queue: higher sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Rank 1.
    Low = 1,
    /// Rank 5.
    Normal = 5,
    /// Rank 8.
    High = 8,
    /// Rank 10.
    Critical = 10,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl TaskPriority {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parses the wire representation.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Numeric scheduling rank (matches the enum discriminant).
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }
}

/// How a task with `max_agents > 1` distributes work across its assignees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// All assigned agents work independently on the same task.
    Parallel,
    /// Assigned agents hand off to one another in sequence.
    Sequential,
    /// The Scheduler chooses parallel or sequential based on load.
    Adaptive,
    /// Assigned agents each produce a result; completion requires consensus.
    Consensus,
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        Self::Adaptive
    }
}

impl ExecutionStrategy {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
            Self::Adaptive => "adaptive",
            Self::Consensus => "consensus",
        }
    }

    /// Parses the wire representation.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "parallel" => Some(Self::Parallel),
            "sequential" => Some(Self::Sequential),
            "adaptive" => Some(Self::Adaptive),
            "consensus" => Some(Self::Consensus),
            _ => None,
        }
    }
}

/// What happens to dependents of a task that exhausts its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Dependents stay blocked forever; the failure propagates.
    Block,
    /// Dependents become ready as though this task had completed.
    Skip,
}

impl Default for OnFailure {
    fn default() -> Self {
        Self::Block
    }
}

impl OnFailure {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Skip => "skip",
        }
    }

    /// Parses the wire representation.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "block" => Some(Self::Block),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// A unit of work scheduled against a swarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// Owning swarm.
    pub swarm_id: SwarmId,
    /// Human-readable description of the work.
    pub description: String,
    /// Scheduling priority.
    pub priority: TaskPriority,
    /// How assigned agents should distribute the work.
    pub strategy: ExecutionStrategy,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Other tasks in the same swarm that must complete first.
    pub dependencies: HashSet<TaskId>,
    /// Capability tags an assigned agent type must cover.
    pub required_capabilities: HashSet<Capability>,
    /// Maximum number of agents this task may be assigned to at once.
    pub max_agents: usize,
    /// Agents currently assigned to this task.
    pub assigned_agents: Vec<Uuid>,
    /// Whether completion must pass a consensus vote before being accepted.
    pub require_consensus: bool,
    /// Number of times this task has been retried after failing.
    pub retries: u32,
    /// Maximum retries before the task is marked permanently failed.
    pub max_retries: u32,
    /// What happens to dependents once retries are exhausted.
    pub on_failure: OnFailure,
    /// Fractional progress in `[0.0, 1.0]`, reported by assigned agents.
    pub progress: f64,
    /// Result payload once completed.
    pub result: Option<String>,
    /// Error message once failed.
    pub error: Option<String>,
    /// When the task was submitted.
    pub created_at: DateTime<Utc>,
    /// When the task was first assigned to an agent.
    pub assigned_at: Option<DateTime<Utc>>,
    /// When the task transitioned to `in_progress`.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Builds a new pending task.
    #[must_use]
    pub fn new(swarm_id: SwarmId, description: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            swarm_id,
            description: description.into(),
            priority: TaskPriority::default(),
            strategy: ExecutionStrategy::default(),
            status: TaskStatus::Pending,
            dependencies: HashSet::new(),
            required_capabilities: HashSet::new(),
            max_agents: 1,
            assigned_agents: Vec::new(),
            require_consensus: false,
            retries: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            on_failure: OnFailure::default(),
            progress: 0.0,
            result: None,
            error: None,
            created_at: Utc::now(),
            assigned_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Builder: sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: sets the execution strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder: adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, task_id: TaskId) -> Self {
        self.dependencies.insert(task_id);
        self
    }

    /// Builder: adds a required capability.
    #[must_use]
    pub fn with_required_capability(mut self, capability: Capability) -> Self {
        self.required_capabilities.insert(capability);
        self
    }

    /// Builder: sets the maximum number of concurrently assigned agents.
    #[must_use]
    pub const fn with_max_agents(mut self, max_agents: usize) -> Self {
        self.max_agents = max_agents;
        self
    }

    /// Builder: requires consensus before completion is accepted.
    #[must_use]
    pub const fn with_require_consensus(mut self, require_consensus: bool) -> Self {
        self.require_consensus = require_consensus;
        self
    }

    /// Builder: sets the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Builder: sets the dependent-skip policy on exhausted retries.
    #[must_use]
    pub const fn with_on_failure(mut self, on_failure: OnFailure) -> Self {
        self.on_failure = on_failure;
        self
    }

    /// Whether `self.status=busy` invariant holds for assignment: the task
    /// has at least one assigned agent and fewer than `max_agents`.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.assigned_agents.len() < self.max_agents
    }

    /// Assigns an agent, transitioning `pending -> assigned` on first
    /// assignment.
    pub fn assign(&mut self, agent_id: Uuid) {
        if !self.assigned_agents.contains(&agent_id) {
            self.assigned_agents.push(agent_id);
        }
        if self.status == TaskStatus::Pending {
            self.status = TaskStatus::Assigned;
            self.assigned_at = Some(Utc::now());
        }
    }

    /// Marks the task started (`assigned -> in_progress`).
    pub fn start(&mut self) {
        self.status = TaskStatus::InProgress;
        self.started_at.get_or_insert_with(Utc::now);
    }

    /// Marks the task completed with the given result.
    pub fn complete(&mut self, result: impl Into<String>) {
        self.status = TaskStatus::Completed;
        self.result = Some(result.into());
        self.progress = 1.0;
        self.completed_at = Some(Utc::now());
    }

    /// Marks the task failed with the given error.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Marks the task cancelled.
    pub fn cancel(&mut self) {
        self.status = TaskStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }

    /// Whether a failed task still has retries left in its budget.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        self.retries < self.max_retries
    }

    /// Resets a failed task back to `pending` for another attempt,
    /// clearing its prior assignment and incrementing the retry counter.
    pub fn retry(&mut self) {
        self.retries += 1;
        self.status = TaskStatus::Pending;
        self.assigned_agents.clear();
        self.error = None;
        self.assigned_at = None;
        self.started_at = None;
        self.completed_at = None;
    }

    /// Whether dependents should treat this exhausted-retry failure as
    /// satisfied rather than blocking forever.
    #[must_use]
    pub const fn skips_dependents_on_failure(&self) -> bool {
        matches!(self.on_failure, OnFailure::Skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_rank_matches_discriminant() {
        assert_eq!(TaskPriority::Low.rank(), 1);
        assert_eq!(TaskPriority::Normal.rank(), 5);
        assert_eq!(TaskPriority::High.rank(), 8);
        assert_eq!(TaskPriority::Critical.rank(), 10);
    }

    #[test]
    fn status_round_trips_through_wire_form() {
        for s in [
            TaskStatus::Pending,
            TaskStatus::Assigned,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
        ] {
            assert_eq!(TaskStatus::parse_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_transitions() {
        assert!(TaskStatus::Completed.valid_transitions().is_empty());
        assert!(TaskStatus::Failed.valid_transitions().is_empty());
        assert!(TaskStatus::Cancelled.valid_transitions().is_empty());
    }

    #[test]
    fn first_assignment_moves_pending_to_assigned() {
        let mut task = Task::new(SwarmId::new(), "do a thing");
        let agent = Uuid::new_v4();
        task.assign(agent);
        assert_eq!(task.status, TaskStatus::Assigned);
        assert!(task.assigned_at.is_some());
        assert_eq!(task.assigned_agents, vec![agent]);
    }

    #[test]
    fn assigning_the_same_agent_twice_is_idempotent() {
        let mut task = Task::new(SwarmId::new(), "do a thing").with_max_agents(2);
        let agent = Uuid::new_v4();
        task.assign(agent);
        task.assign(agent);
        assert_eq!(task.assigned_agents.len(), 1);
    }

    #[test]
    fn complete_sets_progress_to_full() {
        let mut task = Task::new(SwarmId::new(), "do a thing");
        task.complete("done");
        assert_eq!(task.status, TaskStatus::Completed);
        assert!((task.progress - 1.0).abs() < f64::EPSILON);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn has_capacity_respects_max_agents() {
        let mut task = Task::new(SwarmId::new(), "do a thing").with_max_agents(1);
        assert!(task.has_capacity());
        task.assign(Uuid::new_v4());
        assert!(!task.has_capacity());
    }

    #[test]
    fn retry_resets_to_pending_and_increments_counter() {
        let mut task = Task::new(SwarmId::new(), "do a thing");
        task.assign(Uuid::new_v4());
        task.fail("boom");
        assert!(task.can_retry());
        task.retry();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retries, 1);
        assert!(task.assigned_agents.is_empty());
        assert!(task.error.is_none());
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn can_retry_is_false_once_budget_is_exhausted() {
        let mut task = Task::new(SwarmId::new(), "do a thing").with_max_retries(1);
        task.retry();
        assert!(!task.can_retry());
    }

    #[test]
    fn on_failure_skip_reports_dependents_should_proceed() {
        let task = Task::new(SwarmId::new(), "do a thing").with_on_failure(OnFailure::Skip);
        assert!(task.skips_dependents_on_failure());
    }
}
