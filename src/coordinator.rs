//! The Coordinator: the public API surface (§4.8).
//!
//! `Coordinator` owns exactly one swarm and wires together the Store
//! (SQLite, falling back to an in-memory store per §7 if the durable
//! store is unavailable), the Bus, the event bus, the agent pool, the
//! scheduler, consensus, and the Queen. `initialize` opens the store and
//! creates the swarm shell in `initializing` status with no agents;
//! `submit_objective` is what actually spawns the Queen and initial
//! workers and flips the swarm to `active`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::adapters::memory_store::{
    InMemoryAgentRepository, InMemoryConsensusRepository, InMemoryMemoryRepository,
    InMemorySwarmRepository, InMemoryTaskRepository,
};
use crate::adapters::sqlite::{
    self, SqliteAgentRepository, SqliteConsensusRepository, SqliteMemoryRepository,
    SqliteSwarmRepository, SqliteTaskRepository,
};
use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{
    Agent, AgentId, AgentStatus, AgentTypeCatalog, Capability, Config, ConsensusAlgorithm,
    ExecutionStrategy, MemoryEntry, OnFailure, Proposal, ProposalId, ProposalStatus, QueenMode,
    Swarm, SwarmId, SwarmStatus, SystemEvent, Task, TaskId, TaskPriority, TaskStatus, Topology,
};
use crate::domain::ports::{
    AgentFilter, AgentRepository, ConsensusRepository, MemoryRepository, SwarmRepository,
    TaskFilter, TaskRepository,
};
use crate::services::agent_pool::AgentPool;
use crate::services::bus::{Bus, BusStats};
use crate::services::consensus::Consensus;
use crate::services::event_bus::{EventBus, Subscription};
use crate::services::memory_service::{MemoryService, MemoryStats};
use crate::services::queen::Queen;
use crate::services::scheduler::Scheduler;

/// How long `shutdown` waits for the Scheduler to drain cancelled tasks
/// before tearing down the background loops regardless.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(5);

/// How often the Consensus deadline-enforcement tick runs (§4.6.1).
const CONSENSUS_TICK: Duration = Duration::from_secs(5);

/// Options overriding the defaults a swarm's topology/queen mode/worker
/// count would otherwise take from `Config` and objective-text heuristics
/// (§4.7.1).
#[derive(Debug, Clone, Default)]
pub struct ObjectiveOptions {
    /// Overrides the topology chosen from objective-text heuristics.
    pub topology: Option<Topology>,
    /// Overrides the default (centralized) queen authority model.
    pub queen_mode: Option<QueenMode>,
    /// Overrides `Config::max_workers` for this swarm's initial seed.
    pub max_workers: Option<usize>,
}

/// A task specification accepted by `submit_task` (§4.8), mirroring
/// `Task`'s own builder surface.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    description: String,
    priority: TaskPriority,
    strategy: ExecutionStrategy,
    dependencies: Vec<TaskId>,
    required_capabilities: Vec<Capability>,
    max_agents: usize,
    require_consensus: bool,
    max_retries: Option<u32>,
    on_failure: OnFailure,
}

impl TaskSpec {
    /// Builds a task spec with every default the underlying `Task` would
    /// take: normal priority, adaptive strategy, one agent slot.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            priority: TaskPriority::default(),
            strategy: ExecutionStrategy::default(),
            dependencies: Vec::new(),
            required_capabilities: Vec::new(),
            max_agents: 1,
            require_consensus: false,
            max_retries: None,
            on_failure: OnFailure::default(),
        }
    }

    /// Builder: sets priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: sets execution strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder: adds a task dependency.
    #[must_use]
    pub fn with_dependency(mut self, task_id: TaskId) -> Self {
        self.dependencies.push(task_id);
        self
    }

    /// Builder: adds a required capability.
    #[must_use]
    pub fn with_required_capability(mut self, capability: Capability) -> Self {
        self.required_capabilities.push(capability);
        self
    }

    /// Builder: sets the number of agent slots.
    #[must_use]
    pub const fn with_max_agents(mut self, max_agents: usize) -> Self {
        self.max_agents = max_agents;
        self
    }

    /// Builder: requires a consensus vote before this task is considered
    /// complete.
    #[must_use]
    pub const fn with_require_consensus(mut self, require_consensus: bool) -> Self {
        self.require_consensus = require_consensus;
        self
    }

    /// Builder: overrides the default retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Builder: sets dependent-task behavior on failure.
    #[must_use]
    pub const fn with_on_failure(mut self, on_failure: OnFailure) -> Self {
        self.on_failure = on_failure;
        self
    }
}

/// A proposal specification accepted by `propose` (§4.8, §4.6).
#[derive(Debug, Clone)]
pub struct ProposalSpec {
    description: String,
    options: Vec<String>,
    algorithm: Option<ConsensusAlgorithm>,
    eligible_voters: Vec<AgentId>,
    deadline_secs: Option<i64>,
}

impl ProposalSpec {
    /// Builds a proposal spec. `options` must be non-empty; the
    /// algorithm, voter roster, and deadline fall back to the swarm's
    /// configured defaults unless overridden.
    #[must_use]
    pub fn new(description: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            description: description.into(),
            options,
            algorithm: None,
            eligible_voters: Vec::new(),
            deadline_secs: None,
        }
    }

    /// Builder: overrides the tallying algorithm.
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: ConsensusAlgorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Builder: restricts voting to a specific agent roster; defaults to
    /// every live agent in the swarm.
    #[must_use]
    pub fn with_eligible_voters(mut self, voters: Vec<AgentId>) -> Self {
        self.eligible_voters = voters;
        self
    }

    /// Builder: overrides the voting window, in seconds from now.
    #[must_use]
    pub const fn with_deadline_secs(mut self, deadline_secs: i64) -> Self {
        self.deadline_secs = Some(deadline_secs);
        self
    }
}

/// Aggregate snapshot returned by `status()` (§4.8).
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// This coordinator's swarm.
    pub swarm_id: SwarmId,
    /// Wire-form swarm lifecycle status.
    pub swarm_status: &'static str,
    /// Wire-form topology.
    pub topology: &'static str,
    /// Live (non-offline) agent counts by type.
    pub agents_by_type: HashMap<String, usize>,
    /// Task counts by status.
    pub task_counts: HashMap<TaskStatus, u64>,
    /// Collective-memory statistics.
    pub memory_stats: MemoryStats,
    /// Bus delivery statistics.
    pub bus_stats: BusStats,
    /// `false` once the durable store has failed over to the in-memory
    /// fallback (§7).
    pub healthy: bool,
}

/// Wires the Store, Bus, event bus, agent pool, scheduler, consensus, and
/// Queen together behind a single swarm's public API (§4.8).
pub struct Coordinator {
    swarm_id: SwarmId,
    config: Config,
    swarms: Arc<dyn SwarmRepository>,
    tasks: Arc<dyn TaskRepository>,
    agents: Arc<dyn AgentRepository>,
    proposals: Arc<dyn ConsensusRepository>,
    memory: Arc<MemoryService>,
    bus: Arc<Bus>,
    events: Arc<EventBus>,
    agent_pool: Arc<AgentPool>,
    scheduler: Arc<Scheduler>,
    consensus: Arc<Consensus>,
    queen: Arc<Queen>,
    pool: Option<SqlitePool>,
    degraded: AtomicBool,
    cancellation: CancellationToken,
    background: AsyncMutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Opens the Store, runs migrations, constructs the full service
    /// graph, and creates an `initializing` swarm with no agents yet
    /// (§4.8.2). Falls back to an in-memory store if the durable store
    /// cannot be opened or migrated (§7).
    #[instrument(skip(config))]
    pub async fn initialize(config: Config) -> CoordinatorResult<Self> {
        let mut degraded = false;
        #[allow(clippy::type_complexity)]
        let (swarms, tasks, agents, proposals, memory_repo, pool): (
            Arc<dyn SwarmRepository>,
            Arc<dyn TaskRepository>,
            Arc<dyn AgentRepository>,
            Arc<dyn ConsensusRepository>,
            Arc<dyn MemoryRepository>,
            Option<SqlitePool>,
        ) = match Self::open_store(&config).await {
            Ok(pool) => (
                Arc::new(SqliteSwarmRepository::new(pool.clone())),
                Arc::new(SqliteTaskRepository::new(pool.clone())),
                Arc::new(SqliteAgentRepository::new(pool.clone())),
                Arc::new(SqliteConsensusRepository::new(pool.clone())),
                Arc::new(SqliteMemoryRepository::new(pool.clone())),
                Some(pool),
            ),
            Err(err) => {
                warn!(
                    error = %err,
                    "durable store unavailable, falling back to in-memory store (degraded)"
                );
                degraded = true;
                (
                    Arc::new(InMemorySwarmRepository::new()),
                    Arc::new(InMemoryTaskRepository::new()),
                    Arc::new(InMemoryAgentRepository::new()),
                    Arc::new(InMemoryConsensusRepository::new()),
                    Arc::new(InMemoryMemoryRepository::new()),
                    None,
                )
            }
        };

        let catalog = AgentTypeCatalog::default_general_purpose();
        let bus = Arc::new(Bus::new());
        let events = Arc::new(EventBus::new());
        let memory = Arc::new(MemoryService::new(memory_repo, config.memory.cache_capacity));
        let cancellation = CancellationToken::new();
        let scheduler = Arc::new(Scheduler::new(
            tasks.clone(),
            agents.clone(),
            bus.clone(),
            events.clone(),
            catalog.clone(),
            config.scheduler.clone(),
        ));
        let agent_pool = Arc::new(AgentPool::new(
            agents.clone(),
            bus.clone(),
            catalog.clone(),
            scheduler.clone(),
            cancellation.clone(),
        ));
        let consensus = Arc::new(Consensus::new(proposals.clone(), events.clone(), config.consensus.clone()));
        let queen = Arc::new(Queen::new(
            swarms.clone(),
            tasks.clone(),
            agent_pool.clone(),
            events.clone(),
            config.queen.clone(),
        ));

        let swarm = Swarm::new(String::new(), Topology::Hierarchical, config.max_workers);
        let swarm_id = swarm.id;
        swarms.create(&swarm).await?;

        let mut background = Vec::new();
        background.push(tokio::spawn(scheduler.clone().run(swarm_id, cancellation.clone())));
        background.push(tokio::spawn(queen.clone().run(swarm_id, cancellation.clone())));
        background.push(tokio::spawn(consensus.clone().run(CONSENSUS_TICK, cancellation.clone())));
        background.push(tokio::spawn(expiry_sweep_loop(
            memory.clone(),
            Duration::from_secs(config.memory.expiry_sweep_secs),
            cancellation.clone(),
        )));
        background.push(tokio::spawn(eviction_sweep_loop(
            memory.clone(),
            Duration::from_secs(config.memory.eviction_sweep_secs),
            cancellation.clone(),
        )));

        info!(swarm_id = %swarm_id, degraded, "coordinator initialized");

        Ok(Self {
            swarm_id,
            config,
            swarms,
            tasks,
            agents,
            proposals,
            memory,
            bus,
            events,
            agent_pool,
            scheduler,
            consensus,
            queen,
            pool,
            degraded: AtomicBool::new(degraded),
            cancellation,
            background: AsyncMutex::new(background),
        })
    }

    async fn open_store(config: &Config) -> CoordinatorResult<SqlitePool> {
        let database_url = format!("sqlite:{}", config.database.path);
        let pool_config = sqlite::PoolConfig {
            max_connections: config.database.max_connections,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(config.database.acquire_timeout_secs),
        };
        let pool = sqlite::create_pool(&database_url, Some(pool_config))
            .await
            .map_err(|err| CoordinatorError::StoreUnavailable(err.to_string()))?;
        let migrator = sqlite::Migrator::new(pool.clone());
        migrator
            .run_embedded_migrations(sqlite::all_embedded_migrations())
            .await
            .map_err(|err| CoordinatorError::StoreUnavailable(err.to_string()))?;
        Ok(pool)
    }

    /// This coordinator's swarm id.
    #[must_use]
    pub const fn swarm_id(&self) -> SwarmId {
        self.swarm_id
    }

    /// Sets the swarm's objective, spawns the Queen and initial worker
    /// mix, and flips the swarm `initializing -> active` (§4.8, §4.7
    /// point 2). May only be called once, while the swarm is still
    /// `initializing`.
    #[instrument(skip(self, options))]
    pub async fn submit_objective(
        &self,
        objective: impl Into<String>,
        options: ObjectiveOptions,
    ) -> CoordinatorResult<SwarmId> {
        let objective = objective.into();
        let mut swarm = self.get_swarm().await?;
        if swarm.status != SwarmStatus::Initializing {
            return Err(CoordinatorError::InvalidRequest(
                "objective already submitted for this swarm".to_string(),
            ));
        }

        swarm.name = objective.split_whitespace().take(6).collect::<Vec<_>>().join(" ");
        swarm.topology = options.topology.unwrap_or_else(|| Topology::from_objective(&objective));
        if let Some(queen_mode) = options.queen_mode {
            swarm.queen_mode = queen_mode;
        }
        let max_workers = options.max_workers.unwrap_or(self.config.max_workers);
        swarm.max_agents = max_workers;
        swarm.objective = objective.clone();
        self.swarms.update(&swarm).await?;

        self.events.publish(SystemEvent::SwarmSpawned {
            swarm_id: self.swarm_id,
            objective,
        });

        self.queen.seed(self.swarm_id, max_workers).await?;
        Ok(self.swarm_id)
    }

    /// Submits a task to the scheduler (§4.8, §4.5 step 1).
    pub async fn submit_task(&self, spec: TaskSpec) -> CoordinatorResult<TaskId> {
        let mut task = Task::new(self.swarm_id, spec.description)
            .with_priority(spec.priority)
            .with_strategy(spec.strategy)
            .with_max_agents(spec.max_agents)
            .with_require_consensus(spec.require_consensus)
            .with_on_failure(spec.on_failure);
        for dependency in spec.dependencies {
            task = task.with_dependency(dependency);
        }
        for capability in spec.required_capabilities {
            task = task.with_required_capability(capability);
        }
        if let Some(max_retries) = spec.max_retries {
            task = task.with_max_retries(max_retries);
        }
        self.scheduler.submit(task).await
    }

    /// Cancels a task; idempotent on already-terminal tasks (§4.5).
    pub async fn cancel_task(&self, task_id: TaskId) -> CoordinatorResult<()> {
        self.scheduler.cancel(task_id).await
    }

    /// Fetches a single task.
    pub async fn get_task(&self, task_id: TaskId) -> CoordinatorResult<Option<Task>> {
        self.tasks.get(task_id).await
    }

    /// Lists this swarm's tasks, optionally filtered by status.
    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> CoordinatorResult<Vec<Task>> {
        self.tasks
            .list(TaskFilter { swarm_id: Some(self.swarm_id), status })
            .await
    }

    /// Lists this swarm's agents, optionally filtered by status.
    pub async fn list_agents(&self, status: Option<AgentStatus>) -> CoordinatorResult<Vec<Agent>> {
        self.agent_pool
            .list(AgentFilter { swarm_id: Some(self.swarm_id), status, agent_type: None })
            .await
    }

    /// Opens a consensus proposal among this swarm's agents (§4.8, §4.6).
    #[instrument(skip(self, spec))]
    pub async fn propose(&self, spec: ProposalSpec) -> CoordinatorResult<ProposalId> {
        let algorithm = spec.algorithm.unwrap_or_else(|| {
            ConsensusAlgorithm::parse_str(&self.config.consensus.default_algorithm)
                .unwrap_or(ConsensusAlgorithm::Majority)
        });
        let eligible_voters = if spec.eligible_voters.is_empty() {
            self.list_agents(None)
                .await?
                .into_iter()
                .filter(|agent| agent.status != AgentStatus::Offline)
                .map(|agent| agent.id)
                .collect()
        } else {
            spec.eligible_voters
        };
        let deadline_secs = spec.deadline_secs.unwrap_or(self.config.consensus.default_deadline_secs);
        let deadline = Utc::now() + ChronoDuration::seconds(deadline_secs);
        self.consensus
            .propose(self.swarm_id, spec.description, spec.options, algorithm, eligible_voters, deadline)
            .await
    }

    /// Casts a vote on an open proposal (§4.8, §4.6).
    pub async fn vote(&self, proposal_id: ProposalId, voter: AgentId, choice: String) -> CoordinatorResult<()> {
        self.consensus.vote(proposal_id, voter, choice).await
    }

    /// Fetches a single proposal.
    pub async fn get_proposal(&self, proposal_id: ProposalId) -> CoordinatorResult<Option<Proposal>> {
        self.proposals.get(proposal_id).await
    }

    /// Lists this swarm's proposals, optionally filtered by status.
    pub async fn list_proposals(&self, status: Option<ProposalStatus>) -> CoordinatorResult<Vec<Proposal>> {
        self.proposals.list(self.swarm_id, status).await
    }

    /// Declares a namespace's retention policy (§4.2), e.g. a
    /// `TimeBased` namespace so entries stored into it expire. Namespaces
    /// are `Persistent` by default if never declared; `"default"`
    /// is always implicitly `Persistent`.
    pub fn memory_declare_namespace(&self, namespace: impl Into<String>, retention: crate::domain::models::RetentionPolicy) {
        self.memory.declare_namespace(namespace, retention);
    }

    /// Stores a collective-memory entry (§4.8, §4.2).
    pub async fn memory_store(&self, namespace: &str, key: &str, value: serde_json::Value) -> CoordinatorResult<()> {
        self.memory.store(namespace, key, value).await
    }

    /// Retrieves a collective-memory entry's value, if present and
    /// unexpired.
    pub async fn memory_get(&self, namespace: &str, key: &str) -> CoordinatorResult<Option<serde_json::Value>> {
        self.memory.retrieve(namespace, key).await
    }

    /// Deletes a collective-memory entry.
    pub async fn memory_delete(&self, namespace: &str, key: &str) -> CoordinatorResult<()> {
        self.memory.delete(namespace, key).await
    }

    /// Lists entries in a collective-memory namespace.
    pub async fn memory_list(&self, namespace: &str, limit: usize) -> CoordinatorResult<Vec<MemoryEntry>> {
        self.memory.list(namespace, limit).await
    }

    /// Collective-memory statistics.
    pub async fn memory_stats(&self) -> CoordinatorResult<MemoryStats> {
        self.memory.stats().await
    }

    /// Returns an aggregate snapshot of swarm/agent/task/memory/bus state
    /// (§4.8).
    pub async fn status(&self) -> CoordinatorResult<StatusSnapshot> {
        let swarm = self.get_swarm().await?;
        let agents_by_type = self.agents.count_live_by_type(self.swarm_id).await?;
        let task_counts = self.tasks.count_by_status(self.swarm_id).await?;
        let memory_stats = self.memory.stats().await?;
        let bus_stats = self.bus.stats();
        Ok(StatusSnapshot {
            swarm_id: self.swarm_id,
            swarm_status: swarm.status.as_str(),
            topology: swarm.topology.as_str(),
            agents_by_type,
            task_counts,
            memory_stats,
            bus_stats,
            healthy: !self.degraded.load(Ordering::Relaxed),
        })
    }

    /// Subscribes to the swarm's event stream (§4.8). The subscription
    /// lags (and resyncs) rather than blocking the publisher if the
    /// reader falls behind.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    /// Cancels every background loop, drains outstanding tasks, persists
    /// the swarm as `terminated`, and closes the Store pool (§4.8.2).
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> CoordinatorResult<()> {
        let mut swarm = self.get_swarm().await?;
        if swarm.status.can_transition_to(SwarmStatus::ShuttingDown) {
            swarm.begin_shutdown();
            self.swarms.update(&swarm).await?;
        }

        let outstanding = self
            .tasks
            .list(TaskFilter { swarm_id: Some(self.swarm_id), status: None })
            .await?;
        for task in outstanding.into_iter().filter(|task| !task.status.is_terminal()) {
            self.scheduler.cancel(task.id).await?;
        }

        self.cancellation.cancel();
        tokio::time::sleep(SHUTDOWN_DRAIN).await;
        let mut handles = self.background.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);
        self.agent_pool.join_workers().await;

        let mut swarm = self.get_swarm().await?;
        swarm.terminate();
        self.swarms.update(&swarm).await?;
        self.events.publish(SystemEvent::SwarmFinished {
            swarm_id: self.swarm_id,
            status: "terminated",
        });

        if let Some(pool) = &self.pool {
            pool.close().await;
        }

        info!(swarm_id = %self.swarm_id, "coordinator shut down");
        Ok(())
    }

    async fn get_swarm(&self) -> CoordinatorResult<Swarm> {
        self.swarms
            .get(self.swarm_id)
            .await?
            .ok_or_else(|| CoordinatorError::UnknownEntity { kind: "swarm", id: self.swarm_id.to_string() })
    }
}

async fn expiry_sweep_loop(memory: Arc<MemoryService>, tick: Duration, cancellation: CancellationToken) {
    loop {
        tokio::select! {
            () = cancellation.cancelled() => {
                info!("memory expiry sweep shutting down");
                return;
            }
            () = tokio::time::sleep(tick) => {}
        }
        if let Err(err) = memory.sweep_expired().await {
            warn!(error = %err, "memory expiry sweep failed");
        }
    }
}

async fn eviction_sweep_loop(memory: Arc<MemoryService>, tick: Duration, cancellation: CancellationToken) {
    loop {
        tokio::select! {
            () = cancellation.cancelled() => {
                info!("memory eviction sweep shutting down");
                return;
            }
            () = tokio::time::sleep(tick) => {}
        }
        if let Err(err) = memory.enforce_retention().await {
            warn!(error = %err, "memory eviction sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.database.path = dir.path().join("hivemind.db").display().to_string();
        config
    }

    #[tokio::test]
    async fn initialize_creates_an_initializing_swarm_with_no_agents() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::initialize(test_config(&dir)).await.unwrap();

        let status = coordinator.status().await.unwrap();
        assert_eq!(status.swarm_status, SwarmStatus::Initializing.as_str());
        assert!(status.healthy);
        assert!(coordinator.list_agents(None).await.unwrap().is_empty());

        coordinator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn submit_objective_rejects_a_second_call() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::initialize(test_config(&dir)).await.unwrap();

        coordinator
            .submit_objective("first objective", ObjectiveOptions::default())
            .await
            .unwrap();
        let status = coordinator.status().await.unwrap();
        assert_eq!(status.swarm_status, SwarmStatus::Active.as_str());

        let second = coordinator.submit_objective("second objective", ObjectiveOptions::default()).await;
        assert!(matches!(second, Err(CoordinatorError::InvalidRequest(_))));

        coordinator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn submit_objective_honors_a_max_workers_override() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::initialize(test_config(&dir)).await.unwrap();

        coordinator
            .submit_objective(
                "build a thing",
                ObjectiveOptions { max_workers: Some(2), ..Default::default() },
            )
            .await
            .unwrap();

        // One Queen agent plus two workers, regardless of the global
        // `Config::max_workers` default.
        let agents = coordinator.list_agents(None).await.unwrap();
        assert_eq!(agents.len(), 3);

        coordinator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn submit_task_then_cancel_task_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::initialize(test_config(&dir)).await.unwrap();
        coordinator.submit_objective("build a thing", ObjectiveOptions::default()).await.unwrap();

        let task_id = coordinator
            .submit_task(TaskSpec::new("a task").with_priority(TaskPriority::High))
            .await
            .unwrap();

        let task = coordinator.get_task(task_id).await.unwrap().unwrap();
        assert_eq!(task.priority, TaskPriority::High);
        assert_ne!(task.status, TaskStatus::Cancelled);

        coordinator.cancel_task(task_id).await.unwrap();
        let cancelled = coordinator.get_task(task_id).await.unwrap().unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);

        coordinator.shutdown().await.unwrap();
    }

    /// The per-agent worker loop drives a task all the way to
    /// `completed` with no test-side call into the Scheduler — only the
    /// live `AgentPool`/`Scheduler` wiring assembled by `initialize`.
    #[tokio::test]
    async fn an_assigned_task_completes_via_the_live_agent_worker_loop() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::initialize(test_config(&dir)).await.unwrap();
        coordinator
            .submit_objective(
                "build a thing",
                ObjectiveOptions { max_workers: Some(4), ..Default::default() },
            )
            .await
            .unwrap();

        let task_id = coordinator
            .submit_task(TaskSpec::new("implement function").with_required_capability(Capability::new("code")))
            .await
            .unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        let task = loop {
            let task = coordinator.get_task(task_id).await.unwrap().unwrap();
            if task.status == TaskStatus::Completed {
                break task;
            }
            assert!(tokio::time::Instant::now() < deadline, "task never completed");
            tokio::time::sleep(Duration::from_millis(20)).await;
        };
        assert_eq!(task.result.as_deref(), Some("ok"));

        coordinator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn get_task_returns_none_for_an_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::initialize(test_config(&dir)).await.unwrap();
        coordinator.submit_objective("build a thing", ObjectiveOptions::default()).await.unwrap();

        assert!(coordinator.get_task(TaskId::new()).await.unwrap().is_none());

        coordinator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn status_reflects_task_and_agent_counts() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::initialize(test_config(&dir)).await.unwrap();
        coordinator
            .submit_objective(
                "build a thing",
                ObjectiveOptions { max_workers: Some(4), ..Default::default() },
            )
            .await
            .unwrap();

        coordinator.submit_task(TaskSpec::new("task one")).await.unwrap();
        coordinator.submit_task(TaskSpec::new("task two")).await.unwrap();

        let status = coordinator.status().await.unwrap();
        let total_agents: usize = status.agents_by_type.values().sum();
        assert_eq!(total_agents, 5); // queen + 4 default workers
        let total_tasks: u64 = status.task_counts.values().sum();
        assert_eq!(total_tasks, 2);

        coordinator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_terminates_the_swarm_and_is_safe_to_call_once() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::initialize(test_config(&dir)).await.unwrap();
        coordinator.submit_objective("build a thing", ObjectiveOptions::default()).await.unwrap();

        coordinator.shutdown().await.unwrap();

        let status = coordinator.status().await.unwrap();
        assert_eq!(status.swarm_status, SwarmStatus::Terminated.as_str());
    }
}
