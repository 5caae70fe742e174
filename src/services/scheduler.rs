//! Scheduler: turns submitted tasks into agent assignments (§4.5).
//!
//! Runs as one cooperative dispatch loop per swarm: a `tokio::sync::Notify`
//! wakes it whenever a task is submitted, a task finishes, or an agent's
//! status changes; a coarse tick covers work-stealing checks and retry
//! backoff in between, matching the single dispatch-loop framing used
//! elsewhere in this crate (cf. `services::event_bus`).

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{
    Agent, AgentId, AgentTypeCatalog, ExecutionStrategy, Message, MessageBody, SchedulerConfig,
    SwarmId, SystemEvent, Task, TaskId, TaskStatus,
};
use crate::domain::ports::{AgentRepository, TaskFilter, TaskRepository};
use crate::services::bus::Bus;
use crate::services::dependency_resolver::DependencyResolver;
use crate::services::event_bus::EventBus;

/// Turns submitted tasks into agent assignments for one swarm.
pub struct Scheduler {
    tasks: Arc<dyn TaskRepository>,
    agents: Arc<dyn AgentRepository>,
    bus: Arc<Bus>,
    events: Arc<EventBus>,
    catalog: AgentTypeCatalog,
    config: SchedulerConfig,
    notify: Arc<Notify>,
    resolver: DependencyResolver,
}

impl Scheduler {
    /// Builds a scheduler over the given repositories, bus, and event
    /// sink, using `catalog` to decide capability satisfiability.
    #[must_use]
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        agents: Arc<dyn AgentRepository>,
        bus: Arc<Bus>,
        events: Arc<EventBus>,
        catalog: AgentTypeCatalog,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            tasks,
            agents,
            bus,
            events,
            catalog,
            config,
            notify: Arc::new(Notify::new()),
            resolver: DependencyResolver::new(),
        }
    }

    /// A handle other components can use to wake the dispatch loop
    /// without waiting for the next tick.
    #[must_use]
    pub fn waker(&self) -> Arc<Notify> {
        self.notify.clone()
    }

    /// Admission (§4.5 step 1): validates the task, assigns it an id
    /// (already done by `Task::new`), rejects unsatisfiable capability
    /// requirements and dependency cycles, then persists it `pending`.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn submit(&self, task: Task) -> CoordinatorResult<TaskId> {
        if task.description.trim().is_empty() {
            return Err(CoordinatorError::InvalidRequest(
                "task description must not be empty".into(),
            ));
        }

        if !task.required_capabilities.is_empty()
            && self.catalog.find_satisfying(&task.required_capabilities).is_none()
        {
            return Err(CoordinatorError::UnsatisfiableCapability(
                task.required_capabilities.iter().map(ToString::to_string).collect(),
            ));
        }

        let counts = self.tasks.count_by_status(task.swarm_id).await?;
        let in_flight: u64 = counts
            .iter()
            .filter(|(status, _)| !status.is_terminal())
            .map(|(_, count)| *count)
            .sum();
        if in_flight as usize >= self.config.queue_high_watermark {
            return Err(CoordinatorError::Busy(self.config.queue_high_watermark));
        }

        let existing = self
            .tasks
            .list(TaskFilter {
                swarm_id: Some(task.swarm_id),
                status: None,
            })
            .await?;
        self.resolver.validate_dependencies(&task, &existing)?;

        let mut all_tasks = existing;
        all_tasks.push(task.clone());
        if let Some(cycle_node) = self.resolver.detect_cycle(&all_tasks) {
            return Err(CoordinatorError::CyclicDependency(cycle_node.0));
        }

        let id = task.id;
        self.tasks.create(&task).await?;
        self.events.publish(SystemEvent::TaskCreated {
            swarm_id: task.swarm_id,
            task_id: id,
        });
        self.notify.notify_one();
        Ok(id)
    }

    /// Cancellation (§4.5 step 7): idempotent. `pending`/`assigned` tasks
    /// are cancelled immediately and any holding agent is freed.
    /// `in_progress` tasks are asked to stop via a Bus `cancel` message;
    /// the caller (Coordinator) is responsible for the grace-period
    /// timeout that forces `cancelled` if the agent never acknowledges.
    #[instrument(skip(self))]
    pub async fn cancel(&self, task_id: TaskId) -> CoordinatorResult<()> {
        let mut task = self
            .tasks
            .get(task_id)
            .await?
            .ok_or_else(|| CoordinatorError::UnknownEntity {
                kind: "task",
                id: task_id.to_string(),
            })?;

        if task.status.is_terminal() {
            return Ok(());
        }

        let swarm_id = task.swarm_id;
        let assigned = task.assigned_agents.clone();
        task.cancel();
        self.tasks.update(&task).await?;

        for agent_id in assigned {
            if let Some(mut agent) = self.agents.get(AgentId(agent_id)).await? {
                if agent.current_task_id == Some(task_id) {
                    agent.complete_task();
                    self.agents.update(&agent).await?;
                }
                self.bus.send(
                    swarm_id,
                    Message::direct(
                        swarm_id,
                        None,
                        agent.id,
                        MessageBody::Custom(serde_json::json!({"cancel": task_id.to_string()})),
                    ),
                );
            }
        }

        self.notify.notify_one();
        self.cascade_cancel_dependents(swarm_id, task_id).await?;
        Ok(())
    }

    /// Cascades cancellation to `Block`-policy dependents of `task_id`
    /// (§8.2): once a dependency is `cancelled` or has exhausted its
    /// retry budget and failed, a `Block`-policy dependent can never see
    /// its dependency satisfied and would otherwise wait forever.
    /// `Skip`-policy dependents are left alone; `list_ready` already
    /// treats their failed dependency as satisfied.
    async fn cascade_cancel_dependents(&self, swarm_id: SwarmId, task_id: TaskId) -> CoordinatorResult<()> {
        let all = self.tasks.list(TaskFilter { swarm_id: Some(swarm_id), status: None }).await?;
        for dependent in all {
            if dependent.dependencies.contains(&task_id)
                && !dependent.status.is_terminal()
                && !dependent.skips_dependents_on_failure()
            {
                Box::pin(self.cancel(dependent.id)).await?;
            }
        }
        Ok(())
    }

    /// Records a progress report (§4.5 step 5). Progress is purely
    /// advisory; regressions are ignored. The first report transitions
    /// `assigned -> in_progress`.
    #[instrument(skip(self))]
    pub async fn report_progress(&self, task_id: TaskId, progress: f64) -> CoordinatorResult<()> {
        let mut task = self
            .tasks
            .get(task_id)
            .await?
            .ok_or_else(|| CoordinatorError::UnknownEntity {
                kind: "task",
                id: task_id.to_string(),
            })?;

        if task.status.is_terminal() || progress <= task.progress {
            return Ok(());
        }

        if task.status == TaskStatus::Assigned {
            task.start();
        }
        task.progress = progress.clamp(0.0, 1.0);
        self.tasks.update(&task).await?;
        self.events.publish(SystemEvent::TaskProgress {
            swarm_id: task.swarm_id,
            task_id,
            progress: task.progress,
        });
        Ok(())
    }

    /// Records the terminal result of a task's execution (§4.5 step 5):
    /// `in_progress -> completed|failed`. A failed task that still has
    /// retry budget and isn't `strategy=consensus` is retried with
    /// exponential backoff instead of being left failed.
    #[instrument(skip(self, result))]
    pub async fn complete(&self, task_id: TaskId, result: impl Into<String>) -> CoordinatorResult<()> {
        let mut task = self
            .tasks
            .get(task_id)
            .await?
            .ok_or_else(|| CoordinatorError::UnknownEntity {
                kind: "task",
                id: task_id.to_string(),
            })?;

        if task.status.is_terminal() {
            return Ok(());
        }

        for agent_id in &task.assigned_agents {
            if let Some(mut agent) = self.agents.get(AgentId(*agent_id)).await? {
                agent.complete_task();
                self.agents.update(&agent).await?;
            }
        }

        task.complete(result);
        self.tasks.update(&task).await?;
        self.events.publish(SystemEvent::TaskCompleted {
            swarm_id: task.swarm_id,
            task_id,
        });
        self.notify.notify_one();
        Ok(())
    }

    /// Records a task failure, applying the retry policy (§4.5 step 8).
    #[instrument(skip(self, error))]
    pub async fn fail(&self, task_id: TaskId, error: impl Into<String>) -> CoordinatorResult<()> {
        let error = error.into();
        let mut task = self
            .tasks
            .get(task_id)
            .await?
            .ok_or_else(|| CoordinatorError::UnknownEntity {
                kind: "task",
                id: task_id.to_string(),
            })?;

        for agent_id in &task.assigned_agents {
            if let Some(mut agent) = self.agents.get(AgentId(*agent_id)).await? {
                agent.error_task();
                self.agents.update(&agent).await?;
            }
        }

        let retryable = task.strategy != ExecutionStrategy::Consensus && task.can_retry();
        if retryable {
            task.fail(error);
            let backoff = retry_delay(&self.config, task.retries);
            task.retry();
            self.tasks.update(&task).await?;
            debug!(task_id = %task_id, retries = task.retries, backoff_ms = backoff.as_millis() as u64, "retrying failed task");
            let notify = self.notify.clone();
            tokio::spawn(async move {
                tokio::time::sleep(backoff).await;
                notify.notify_one();
            });
        } else {
            task.fail(error.clone());
            self.tasks.update(&task).await?;
            self.events.publish(SystemEvent::TaskFailed {
                swarm_id: task.swarm_id,
                task_id,
                error,
            });
            self.cascade_cancel_dependents(task.swarm_id, task_id).await?;
        }

        self.notify.notify_one();
        Ok(())
    }

    /// One dispatch pass over a single swarm: readiness, capability
    /// match, assignment, and work stealing (§4.5 steps 2-4, 6). Returns
    /// the number of new assignments made.
    #[instrument(skip(self))]
    pub async fn dispatch_once(&self, swarm_id: SwarmId) -> CoordinatorResult<usize> {
        let mut assignments = 0;

        let ready = self.tasks.list_ready(swarm_id, usize::MAX).await?;
        let mut idle = self.agents.list_idle(swarm_id).await?;

        for task in ready {
            if idle.is_empty() {
                break;
            }
            let Some(best_index) = self.best_candidate(&task, &idle) else {
                continue;
            };
            let agent = idle.remove(best_index);
            if self.assign(task, agent).await? {
                assignments += 1;
            }
        }

        assignments += self.steal_idle_work(swarm_id).await?;
        Ok(assignments)
    }

    /// Capability match with tie-break (§4.5 step 3): candidates are idle
    /// agents whose capabilities are a superset of the task's required
    /// set, ranked by (a) keyword-match score of the agent's type against
    /// the task description, (b) fewest in-flight assignments (always 0
    /// among idle candidates, kept for symmetry with the spec's ordering),
    /// (c) most recently completed a task.
    fn best_candidate(&self, task: &Task, idle: &[Agent]) -> Option<usize> {
        idle.iter()
            .enumerate()
            .filter(|(_, agent)| task.required_capabilities.is_subset(&agent.capabilities))
            .max_by_key(|(_, agent)| {
                let keyword_score = self
                    .catalog
                    .get(&agent.agent_type)
                    .map_or(0, |def| def.keyword_score(&task.description));
                let in_flight = 0usize;
                (keyword_score, Reverse(in_flight), agent.updated_at)
            })
            .map(|(index, _)| index)
    }

    /// Assignment (§4.5 step 4), in as close to a single transaction as
    /// the repository ports allow: the task is updated first, then the
    /// agent. If the agent update fails, the task update is rolled back
    /// so the task returns to `ready` and no agent is left double-booked.
    async fn assign(&self, mut task: Task, mut agent: Agent) -> CoordinatorResult<bool> {
        let previous_task = task.clone();
        task.assign(agent.id.0);
        if !agent.assign_task(task.id) {
            return Ok(false);
        }

        if let Err(err) = self.tasks.update(&task).await {
            warn!(task_id = %task.id, error = %err, "assignment aborted, task stays ready");
            return Ok(false);
        }

        if let Err(err) = self.agents.update(&agent).await {
            warn!(agent_id = %agent.id, error = %err, "agent update failed after task assignment, rolling back");
            if let Err(rollback_err) = self.tasks.update(&previous_task).await {
                return Err(CoordinatorError::InternalInvariant(format!(
                    "failed to roll back task {} after partial assignment: {rollback_err}",
                    task.id
                )));
            }
            return Ok(false);
        }

        self.bus.send(
            task.swarm_id,
            Message::direct(
                task.swarm_id,
                None,
                agent.id,
                MessageBody::TaskAssigned {
                    task_id: task.id.0,
                },
            ),
        );
        self.events.publish(SystemEvent::TaskAssigned {
            swarm_id: task.swarm_id,
            task_id: task.id,
            agent_id: agent.id,
        });
        info!(task_id = %task.id, agent_id = %agent.id, "task assigned");
        Ok(true)
    }

    /// Work stealing (§4.5 step 6): an agent idle longer than
    /// `steal_idle_ms` may join an unsaturated `parallel` task that
    /// another agent is already executing.
    async fn steal_idle_work(&self, swarm_id: SwarmId) -> CoordinatorResult<usize> {
        let idle = self.agents.list_idle(swarm_id).await?;
        if idle.is_empty() {
            return Ok(0);
        }

        let threshold = chrono::Duration::milliseconds(self.config.steal_idle_ms as i64);
        let now = chrono::Utc::now();
        let stealers: Vec<_> = idle
            .into_iter()
            .filter(|agent| now.signed_duration_since(agent.updated_at) >= threshold)
            .collect();
        if stealers.is_empty() {
            return Ok(0);
        }

        let in_progress = self
            .tasks
            .list(TaskFilter {
                swarm_id: Some(swarm_id),
                status: Some(TaskStatus::InProgress),
            })
            .await?;

        let mut stolen = 0;
        let mut stealers = stealers.into_iter();
        for mut task in in_progress {
            if task.strategy != ExecutionStrategy::Parallel || task.max_agents <= 1 || !task.has_capacity() {
                continue;
            }
            let Some(mut stealer) = stealers.next() else {
                break;
            };
            if !stealer.assign_task(task.id) {
                continue;
            }
            task.assign(stealer.id.0);
            self.tasks.update(&task).await?;
            self.agents.update(&stealer).await?;
            self.bus.send(
                task.swarm_id,
                Message::direct(
                    task.swarm_id,
                    None,
                    stealer.id,
                    MessageBody::TaskAssigned {
                        task_id: task.id.0,
                    },
                ),
            );
            stolen += 1;
        }
        Ok(stolen)
    }

    /// Runs the dispatch loop for `swarm_id` until `cancellation` fires,
    /// woken either by `notify` or the configured tick.
    pub async fn run(self: Arc<Self>, swarm_id: SwarmId, cancellation: CancellationToken) {
        let tick = Duration::from_millis(self.config.dispatch_tick_ms);
        loop {
            tokio::select! {
                () = cancellation.cancelled() => {
                    info!(swarm_id = %swarm_id, "scheduler dispatch loop shutting down");
                    return;
                }
                () = self.notify.notified() => {}
                () = tokio::time::sleep(tick) => {}
            }

            if let Err(err) = self.dispatch_once(swarm_id).await {
                warn!(swarm_id = %swarm_id, error = %err, "dispatch pass failed");
            }
        }
    }
}

/// Exponential backoff delay for the `attempt`-th retry, bounded by
/// `max_backoff_ms` (§4.5 step 8, numeric semantics per §4.5).
fn retry_delay(config: &SchedulerConfig, attempt: u32) -> Duration {
    let scaled = config.initial_backoff_ms.saturating_mul(1u64 << attempt.min(20));
    Duration::from_millis(scaled.min(config.max_backoff_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::{InMemoryAgentRepository, InMemoryTaskRepository};
    use crate::domain::models::{AgentRole, Capability, OnFailure};

    fn scheduler() -> (Arc<Scheduler>, Arc<InMemoryTaskRepository>, Arc<InMemoryAgentRepository>) {
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new());
        let scheduler = Arc::new(Scheduler::new(
            tasks.clone(),
            agents.clone(),
            Arc::new(Bus::new()),
            Arc::new(EventBus::new()),
            AgentTypeCatalog::default_general_purpose(),
            SchedulerConfig::default(),
        ));
        (scheduler, tasks, agents)
    }

    #[tokio::test]
    async fn submit_rejects_unsatisfiable_capability() {
        let (scheduler, ..) = scheduler();
        let task = Task::new(SwarmId::new(), "do a thing")
            .with_required_capability(Capability::new("quantum_annealing"));
        assert!(matches!(
            scheduler.submit(task).await,
            Err(CoordinatorError::UnsatisfiableCapability(_))
        ));
    }

    #[tokio::test]
    async fn submit_rejects_cyclic_dependencies() {
        let (scheduler, tasks, _agents) = scheduler();
        let swarm_id = SwarmId::new();
        let mut t1 = Task::new(swarm_id, "first");
        let t2 = Task::new(swarm_id, "second").with_dependency(t1.id);
        t1.dependencies.insert(t2.id);
        tasks.create(&t2).await.unwrap();

        assert!(matches!(
            scheduler.submit(t1).await,
            Err(CoordinatorError::CyclicDependency(_))
        ));
    }

    #[tokio::test]
    async fn submit_rejects_unknown_dependency() {
        let (scheduler, ..) = scheduler();
        let missing = TaskId::new();
        let task = Task::new(SwarmId::new(), "blocked").with_dependency(missing);
        assert!(matches!(
            scheduler.submit(task).await,
            Err(CoordinatorError::UnknownDependency(_))
        ));
    }

    #[tokio::test]
    async fn dispatch_assigns_a_ready_task_to_a_capable_idle_agent() {
        let (scheduler, tasks, agents) = scheduler();
        let swarm_id = SwarmId::new();

        let agent = Agent::new(swarm_id, AgentRole::Worker, "coder", [Capability::new("code")]);
        agents.create(&agent).await.unwrap();

        let task = Task::new(swarm_id, "write some code").with_required_capability(Capability::new("code"));
        let task_id = scheduler.submit(task).await.unwrap();

        let assigned = scheduler.dispatch_once(swarm_id).await.unwrap();
        assert_eq!(assigned, 1);

        let task = tasks.get(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);
        let agent = agents.get(agent.id).await.unwrap().unwrap();
        assert_eq!(agent.current_task_id, Some(task_id));
    }

    #[tokio::test]
    async fn dispatch_leaves_task_ready_when_no_capable_agent_is_idle() {
        let (scheduler, tasks, _agents) = scheduler();
        let swarm_id = SwarmId::new();
        let task = Task::new(swarm_id, "write some code").with_required_capability(Capability::new("code"));
        let task_id = scheduler.submit(task).await.unwrap();

        let assigned = scheduler.dispatch_once(swarm_id).await.unwrap();
        assert_eq!(assigned, 0);
        assert_eq!(tasks.get(task_id).await.unwrap().unwrap().status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn dependent_task_becomes_ready_once_its_dependency_completes() {
        let (scheduler, tasks, agents) = scheduler();
        let swarm_id = SwarmId::new();
        let agent = Agent::new(swarm_id, AgentRole::Worker, "coder", [Capability::new("code")]);
        agents.create(&agent).await.unwrap();

        let blocker = Task::new(swarm_id, "write some code").with_required_capability(Capability::new("code"));
        let blocker_id = scheduler.submit(blocker).await.unwrap();
        let blocked = Task::new(swarm_id, "write more code")
            .with_required_capability(Capability::new("code"))
            .with_dependency(blocker_id);
        let blocked_id = scheduler.submit(blocked).await.unwrap();

        scheduler.dispatch_once(swarm_id).await.unwrap();
        assert_eq!(tasks.get(blocked_id).await.unwrap().unwrap().status, TaskStatus::Pending);

        scheduler.complete(blocker_id, "done").await.unwrap();
        scheduler.dispatch_once(swarm_id).await.unwrap();
        assert_eq!(tasks.get(blocked_id).await.unwrap().unwrap().status, TaskStatus::Assigned);
    }

    #[tokio::test]
    async fn progress_regressions_are_ignored() {
        let (scheduler, tasks, agents) = scheduler();
        let swarm_id = SwarmId::new();
        let agent = Agent::new(swarm_id, AgentRole::Worker, "coder", [Capability::new("code")]);
        agents.create(&agent).await.unwrap();
        let task = Task::new(swarm_id, "write code").with_required_capability(Capability::new("code"));
        let task_id = scheduler.submit(task).await.unwrap();
        scheduler.dispatch_once(swarm_id).await.unwrap();

        scheduler.report_progress(task_id, 0.5).await.unwrap();
        scheduler.report_progress(task_id, 0.2).await.unwrap();

        let task = tasks.get(task_id).await.unwrap().unwrap();
        assert!((task.progress - 0.5).abs() < f64::EPSILON);
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn cancel_is_idempotent_on_a_terminal_task() {
        let (scheduler, tasks, _agents) = scheduler();
        let swarm_id = SwarmId::new();
        let task = Task::new(swarm_id, "write code");
        let task_id = scheduler.submit(task).await.unwrap();
        scheduler.cancel(task_id).await.unwrap();
        scheduler.cancel(task_id).await.unwrap();
        assert_eq!(tasks.get(task_id).await.unwrap().unwrap().status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_cascades_to_a_block_policy_dependent() {
        let (scheduler, tasks, _agents) = scheduler();
        let swarm_id = SwarmId::new();
        let blocker = Task::new(swarm_id, "blocker");
        let blocker_id = scheduler.submit(blocker).await.unwrap();
        let blocked = Task::new(swarm_id, "blocked").with_dependency(blocker_id);
        let blocked_id = scheduler.submit(blocked).await.unwrap();

        scheduler.cancel(blocker_id).await.unwrap();

        assert_eq!(tasks.get(blocker_id).await.unwrap().unwrap().status, TaskStatus::Cancelled);
        assert_eq!(tasks.get(blocked_id).await.unwrap().unwrap().status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_does_not_cascade_to_a_skip_policy_dependent() {
        let (scheduler, tasks, _agents) = scheduler();
        let swarm_id = SwarmId::new();
        let blocker = Task::new(swarm_id, "blocker");
        let blocker_id = scheduler.submit(blocker).await.unwrap();
        let skipper = Task::new(swarm_id, "skipper")
            .with_dependency(blocker_id)
            .with_on_failure(OnFailure::Skip);
        let skipper_id = scheduler.submit(skipper).await.unwrap();

        scheduler.cancel(blocker_id).await.unwrap();

        assert_eq!(tasks.get(skipper_id).await.unwrap().unwrap().status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn cancel_cascades_through_a_chain_of_dependents() {
        let (scheduler, tasks, _agents) = scheduler();
        let swarm_id = SwarmId::new();
        let t1 = Task::new(swarm_id, "t1");
        let t1_id = scheduler.submit(t1).await.unwrap();
        let t2 = Task::new(swarm_id, "t2").with_dependency(t1_id);
        let t2_id = scheduler.submit(t2).await.unwrap();
        let t3 = Task::new(swarm_id, "t3").with_dependency(t2_id);
        let t3_id = scheduler.submit(t3).await.unwrap();

        scheduler.cancel(t1_id).await.unwrap();

        assert_eq!(tasks.get(t2_id).await.unwrap().unwrap().status, TaskStatus::Cancelled);
        assert_eq!(tasks.get(t3_id).await.unwrap().unwrap().status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn exhausted_failure_cascades_to_a_block_policy_dependent() {
        let (scheduler, tasks, agents) = scheduler();
        let swarm_id = SwarmId::new();
        let agent = Agent::new(swarm_id, AgentRole::Worker, "coder", [Capability::new("code")]);
        agents.create(&agent).await.unwrap();
        let blocker = Task::new(swarm_id, "blocker")
            .with_required_capability(Capability::new("code"))
            .with_max_retries(0);
        let blocker_id = scheduler.submit(blocker).await.unwrap();
        let blocked = Task::new(swarm_id, "blocked").with_dependency(blocker_id);
        let blocked_id = scheduler.submit(blocked).await.unwrap();
        scheduler.dispatch_once(swarm_id).await.unwrap();

        scheduler.fail(blocker_id, "boom").await.unwrap();

        assert_eq!(tasks.get(blocker_id).await.unwrap().unwrap().status, TaskStatus::Failed);
        assert_eq!(tasks.get(blocked_id).await.unwrap().unwrap().status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn fail_retries_with_backoff_until_the_budget_is_exhausted() {
        let (scheduler, tasks, agents) = scheduler();
        let swarm_id = SwarmId::new();
        let agent = Agent::new(swarm_id, AgentRole::Worker, "coder", [Capability::new("code")]);
        agents.create(&agent).await.unwrap();
        let task = Task::new(swarm_id, "write code")
            .with_required_capability(Capability::new("code"))
            .with_max_retries(1);
        let task_id = scheduler.submit(task).await.unwrap();
        scheduler.dispatch_once(swarm_id).await.unwrap();

        scheduler.fail(task_id, "boom").await.unwrap();
        let task = tasks.get(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retries, 1);

        scheduler.fail(task_id, "boom again").await.unwrap();
        let task = tasks.get(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[test]
    fn retry_delay_is_bounded_by_max_backoff() {
        let config = SchedulerConfig {
            initial_backoff_ms: 500,
            max_backoff_ms: 2_000,
            ..SchedulerConfig::default()
        };
        assert_eq!(retry_delay(&config, 0), Duration::from_millis(500));
        assert_eq!(retry_delay(&config, 10), Duration::from_millis(2_000));
    }
}
