//! Agent lifecycle and capability-set management (§4.4).
//!
//! Spawning allocates an identifier, records the agent in the Store with
//! status `idle`, and registers a Bus mailbox. Retirement drains the
//! mailbox (deadline-bounded) before removing the endpoint.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{
    Agent, AgentId, AgentRole, AgentTypeCatalog, Capability, Message, MessageBody, SwarmId, TaskId,
};
use crate::domain::ports::{AgentFilter, AgentRepository};
use crate::services::bus::Bus;
use crate::services::scheduler::Scheduler;

/// Deadline for draining an agent's mailbox before its Bus endpoint is
/// removed on retirement (§4.4, default 5s).
pub const DEFAULT_DRAIN_DEADLINE: Duration = Duration::from_secs(5);

/// Simulated work duration for an agent's outbound execution of an
/// assigned task: this pool models agent work as an opaque, uniformly
/// short operation rather than real tool/LLM execution (§4.5 step 5,
/// `Task.result` is opaque).
const SIMULATED_EXECUTION: Duration = Duration::from_millis(50);

/// Manages agent spawn/retire and capability lookups for one swarm.
pub struct AgentPool {
    repo: Arc<dyn AgentRepository>,
    bus: Arc<Bus>,
    catalog: AgentTypeCatalog,
    scheduler: Arc<Scheduler>,
    cancellation: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AgentPool {
    /// Builds a pool backed by `repo` and `bus`, using `catalog` to
    /// resolve agent-type capability sets. `scheduler` drives each
    /// spawned agent's outbound execution loop; `cancellation` is the
    /// shared shutdown signal those loops select against.
    #[must_use]
    pub fn new(
        repo: Arc<dyn AgentRepository>,
        bus: Arc<Bus>,
        catalog: AgentTypeCatalog,
        scheduler: Arc<Scheduler>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            repo,
            bus,
            catalog,
            scheduler,
            cancellation,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// The capability catalog this pool resolves agent types against.
    #[must_use]
    pub const fn catalog(&self) -> &AgentTypeCatalog {
        &self.catalog
    }

    /// Spawns a new idle agent of `agent_type`, registering its Bus
    /// mailbox and persisting it with status `idle`. Capability sets are
    /// looked up from the catalog and are immutable for the agent's
    /// lifetime; an explicit `extra_capabilities` set is merged in for
    /// one-off grants.
    #[instrument(skip(self, extra_capabilities))]
    pub async fn spawn(
        &self,
        swarm_id: SwarmId,
        role: AgentRole,
        agent_type: &str,
        extra_capabilities: impl IntoIterator<Item = Capability>,
    ) -> CoordinatorResult<Agent> {
        let mut capabilities: HashSet<Capability> = self
            .catalog
            .get(agent_type)
            .map(|def| def.capabilities.clone())
            .unwrap_or_default();
        capabilities.extend(extra_capabilities);

        let agent = Agent::new(swarm_id, role, agent_type, capabilities);
        self.repo.create(&agent).await?;

        let mailbox = self.bus.register(agent.id);
        let handle = tokio::spawn(agent_worker_loop(
            agent.id,
            mailbox,
            self.scheduler.clone(),
            self.cancellation.clone(),
        ));
        self.workers.lock().push(handle);

        info!(agent_id = %agent.id, agent_type, "agent spawned");
        Ok(agent)
    }

    /// Awaits every per-agent worker loop spawned by this pool, draining
    /// the retained handle set. Called during coordinator shutdown
    /// alongside the other background loops.
    pub async fn join_workers(&self) {
        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Retires an agent: transitions it `-> offline`, drains its mailbox
    /// up to `DEFAULT_DRAIN_DEADLINE`, then removes the Bus endpoint.
    #[instrument(skip(self))]
    pub async fn retire(&self, agent_id: AgentId) -> CoordinatorResult<()> {
        let mut agent = self
            .repo
            .get(agent_id)
            .await?
            .ok_or_else(|| CoordinatorError::UnknownEntity {
                kind: "agent",
                id: agent_id.to_string(),
            })?;

        agent.retire();
        self.repo.update(&agent).await?;

        // Draining is best-effort: re-register to get a receiver, drain
        // whatever is queued up to the deadline, then drop the endpoint.
        let mut mailbox = self.bus.register(agent_id);
        let _ = timeout(DEFAULT_DRAIN_DEADLINE, async {
            while mailbox.recv().await.is_some() {}
        })
        .await;
        self.bus.unregister(agent_id);

        info!(agent_id = %agent_id, "agent retired");
        Ok(())
    }

    /// Finds an idle agent whose capabilities satisfy `required`,
    /// preferring (in order) the highest description keyword-match
    /// score, fewest in-flight assignments, then most recently
    /// completed a task — the Scheduler's capability-match tie-break
    /// (§4.5 step 3). Here the pool only surfaces idle candidates and
    /// their type defs; the Scheduler applies the ordering, since it
    /// alone knows in-flight assignment counts.
    pub async fn idle_agents(&self, swarm_id: SwarmId) -> CoordinatorResult<Vec<Agent>> {
        self.repo.list_idle(swarm_id).await
    }

    /// Lists every agent in a swarm matching `filter`.
    pub async fn list(&self, filter: AgentFilter) -> CoordinatorResult<Vec<Agent>> {
        self.repo.list(filter).await
    }

    /// Counts live (non-offline) agents per type, used by the Queen to
    /// check `max_instances`/`max_workers` before spawning.
    pub async fn count_live_by_type(&self, swarm_id: SwarmId) -> CoordinatorResult<std::collections::HashMap<String, usize>> {
        self.repo.count_live_by_type(swarm_id).await
    }
}

/// An agent's outbound execution loop (§4.5 step 5, §4.8.1): one per
/// spawned agent, cooperatively draining its Bus mailbox and driving the
/// Scheduler's `report_progress`/`complete` transitions for whatever task
/// it is assigned. Exits when `cancellation` fires or the mailbox closes
/// (on retirement, `AgentPool::retire` re-registers the agent's endpoint,
/// which drops this loop's sender and ends `recv` with `None`).
async fn agent_worker_loop(
    agent_id: AgentId,
    mut mailbox: tokio::sync::mpsc::Receiver<Message>,
    scheduler: Arc<Scheduler>,
    cancellation: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            () = cancellation.cancelled() => return,
            message = mailbox.recv() => message,
        };

        let Some(message) = message else {
            return;
        };

        let MessageBody::TaskAssigned { task_id } = message.body else {
            continue;
        };
        let task_id = TaskId(task_id);

        if let Err(err) = scheduler.report_progress(task_id, 0.5).await {
            warn!(agent_id = %agent_id, task_id = %task_id, error = %err, "progress report failed");
            continue;
        }

        tokio::select! {
            () = cancellation.cancelled() => return,
            () = tokio::time::sleep(SIMULATED_EXECUTION) => {}
        }

        if let Err(err) = scheduler.complete(task_id, "ok").await {
            warn!(agent_id = %agent_id, task_id = %task_id, error = %err, "task completion failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::{InMemoryAgentRepository, InMemoryTaskRepository};
    use crate::domain::models::SchedulerConfig;
    use crate::services::event_bus::EventBus;

    fn pool() -> AgentPool {
        let bus = Arc::new(Bus::new());
        let catalog = AgentTypeCatalog::default_general_purpose();
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(InMemoryTaskRepository::new()),
            Arc::new(InMemoryAgentRepository::new()),
            bus.clone(),
            Arc::new(EventBus::new()),
            catalog.clone(),
            SchedulerConfig::default(),
        ));
        AgentPool::new(
            Arc::new(InMemoryAgentRepository::new()),
            bus,
            catalog,
            scheduler,
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn spawn_resolves_capabilities_from_the_catalog() {
        let pool = pool();
        let agent = pool
            .spawn(SwarmId::new(), AgentRole::Worker, "coder", [])
            .await
            .unwrap();
        assert!(agent.capabilities.contains(&Capability::new("code")));
    }

    #[tokio::test]
    async fn spawn_merges_extra_capabilities() {
        let pool = pool();
        let agent = pool
            .spawn(
                SwarmId::new(),
                AgentRole::Worker,
                "coder",
                [Capability::new("special")],
            )
            .await
            .unwrap();
        assert!(agent.capabilities.contains(&Capability::new("special")));
        assert!(agent.capabilities.contains(&Capability::new("code")));
    }

    #[tokio::test]
    async fn retire_marks_agent_offline() {
        let pool = pool();
        let swarm_id = SwarmId::new();
        let agent = pool.spawn(swarm_id, AgentRole::Worker, "coder", []).await.unwrap();
        pool.retire(agent.id).await.unwrap();

        let agents = pool
            .list(AgentFilter {
                swarm_id: Some(swarm_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(agents[0].status, crate::domain::models::AgentStatus::Offline);
    }

    #[tokio::test]
    async fn retire_unknown_agent_is_an_error() {
        let pool = pool();
        assert!(pool.retire(AgentId::new()).await.is_err());
    }
}
