//! Queen: topology choice, pool seeding, auto-scaling, and error recovery
//! (§4.7).
//!
//! The Queen is itself an agent with a strategy role rather than a
//! separate process; this service is the strategic logic the Coordinator
//! drives on its behalf, mirroring how the Scheduler's dispatch loop
//! drives ordinary task assignment.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{
    Agent, AgentId, AgentRole, AgentStatus, AgentTypeCatalog, QueenConfig, Swarm, SwarmId,
    SystemEvent, TaskStatus, Topology,
};
use crate::domain::ports::{AgentFilter, SwarmRepository, TaskFilter, TaskRepository};
use crate::services::agent_pool::AgentPool;
use crate::services::event_bus::EventBus;

/// Initial worker mix seeded at swarm start, subject to `max_workers`
/// (§4.7 point 2).
const DEFAULT_WORKER_MIX: &[&str] = &["researcher", "coder", "analyst", "tester"];

/// Outcome of one `autoscale` check, for logging/testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleAction {
    /// A worker of the given type was spawned.
    ScaledUp(String),
    /// The named agent was marked for retirement.
    ScaledDown(AgentId),
}

/// Strategic logic for one swarm: topology choice, pool seeding,
/// auto-scale, and error recovery.
pub struct Queen {
    swarms: Arc<dyn SwarmRepository>,
    tasks: Arc<dyn TaskRepository>,
    agent_pool: Arc<AgentPool>,
    events: Arc<EventBus>,
    config: QueenConfig,
    restart_log: tokio::sync::Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl Queen {
    /// Builds a Queen over the given swarm/task repositories and agent
    /// pool.
    #[must_use]
    pub fn new(
        swarms: Arc<dyn SwarmRepository>,
        tasks: Arc<dyn TaskRepository>,
        agent_pool: Arc<AgentPool>,
        events: Arc<EventBus>,
        config: QueenConfig,
    ) -> Self {
        Self {
            swarms,
            tasks,
            agent_pool,
            events,
            config,
            restart_log: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Chooses a topology from objective text (§4.7 point 1).
    #[must_use]
    pub fn choose_topology(objective: &str) -> Topology {
        Topology::from_objective(objective)
    }

    /// Seeds a freshly initialized swarm with a Queen agent plus the
    /// default worker mix, bounded by `max_workers`, then activates the
    /// swarm (§4.7 point 2).
    #[instrument(skip(self))]
    pub async fn seed(&self, swarm_id: SwarmId, max_workers: usize) -> CoordinatorResult<Vec<Agent>> {
        let mut swarm = self
            .swarms
            .get(swarm_id)
            .await?
            .ok_or_else(|| CoordinatorError::UnknownEntity {
                kind: "swarm",
                id: swarm_id.to_string(),
            })?;

        let mut spawned = Vec::new();
        let queen = self.agent_pool.spawn(swarm_id, AgentRole::Queen, "queen", []).await?;
        self.events.publish(SystemEvent::AgentSpawned {
            swarm_id,
            agent_id: queen.id,
            agent_type: queen.agent_type.clone(),
        });
        spawned.push(queen);

        let mut workers = 0usize;
        for agent_type in DEFAULT_WORKER_MIX {
            if workers >= max_workers.max(1) {
                break;
            }
            let worker = self.agent_pool.spawn(swarm_id, AgentRole::Worker, agent_type, []).await?;
            self.events.publish(SystemEvent::AgentSpawned {
                swarm_id,
                agent_id: worker.id,
                agent_type: worker.agent_type.clone(),
            });
            spawned.push(worker);
            workers += 1;
        }

        swarm.activate();
        self.swarms.update(&swarm).await?;
        info!(swarm_id = %swarm_id, spawned = spawned.len(), "swarm seeded and activated");
        Ok(spawned)
    }

    /// One auto-scale check (§4.7 point 3): scales up when
    /// `pending > 2·idle` and the pool has room under `max_agents`; scales
    /// down the least-recently-used idle worker when `idle > pending + 2`
    /// and the pool has more than two live agents. No-op if
    /// `autoscale_enabled` is false.
    #[instrument(skip(self))]
    pub async fn autoscale(&self, swarm_id: SwarmId) -> CoordinatorResult<Option<ScaleAction>> {
        if !self.config.autoscale_enabled {
            return Ok(None);
        }

        let swarm = self
            .swarms
            .get(swarm_id)
            .await?
            .ok_or_else(|| CoordinatorError::UnknownEntity {
                kind: "swarm",
                id: swarm_id.to_string(),
            })?;

        let counts = self.tasks.count_by_status(swarm_id).await?;
        let pending = counts.get(&TaskStatus::Pending).copied().unwrap_or(0) as usize;
        let idle_agents = self.agent_pool.idle_agents(swarm_id).await?;
        let idle = idle_agents.len();
        let live_by_type = self.agent_pool.count_live_by_type(swarm_id).await?;
        let pool_size: usize = live_by_type.values().sum();

        if pending > 2 * idle && pool_size < swarm.max_agents {
            let agent_type = self.most_in_demand_type(swarm_id).await?;
            let before = pool_size;
            let worker = self
                .agent_pool
                .spawn(swarm_id, AgentRole::Worker, &agent_type, [])
                .await?;
            self.events.publish(SystemEvent::AgentSpawned {
                swarm_id,
                agent_id: worker.id,
                agent_type: worker.agent_type.clone(),
            });
            self.events.publish(SystemEvent::PoolScaled {
                swarm_id,
                previous_size: before,
                new_size: before + 1,
            });
            info!(swarm_id = %swarm_id, agent_type, "scaled up");
            return Ok(Some(ScaleAction::ScaledUp(agent_type)));
        }

        if idle > pending + 2 && pool_size > 2 {
            if let Some(victim) = idle_agents
                .iter()
                .filter(|agent| agent.role == AgentRole::Worker)
                .min_by_key(|agent| agent.updated_at)
            {
                let victim_id = victim.id;
                self.agent_pool.retire(victim_id).await?;
                self.events.publish(SystemEvent::AgentRetired {
                    swarm_id,
                    agent_id: victim_id,
                });
                self.events.publish(SystemEvent::PoolScaled {
                    swarm_id,
                    previous_size: pool_size,
                    new_size: pool_size - 1,
                });
                info!(swarm_id = %swarm_id, agent_id = %victim_id, "scaled down");
                return Ok(Some(ScaleAction::ScaledDown(victim_id)));
            }
        }

        Ok(None)
    }

    /// Scans pending task descriptions against the pool's capability
    /// catalog keyword table and returns the type with the highest total
    /// score, falling back to the first worker type in the default mix.
    async fn most_in_demand_type(&self, swarm_id: SwarmId) -> CoordinatorResult<String> {
        let pending = self
            .tasks
            .list(TaskFilter {
                swarm_id: Some(swarm_id),
                status: Some(TaskStatus::Pending),
            })
            .await?;

        let catalog: &AgentTypeCatalog = self.agent_pool.catalog();
        let mut best: Option<(&str, usize)> = None;
        for def in catalog.iter() {
            let score: usize = pending.iter().map(|t| def.keyword_score(&t.description)).sum();
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((def.name.as_str(), score));
            }
        }

        Ok(match best {
            Some((name, score)) if score > 0 => name.to_string(),
            _ => DEFAULT_WORKER_MIX[0].to_string(),
        })
    }

    /// Recovers an agent that entered `error` (§4.7 point 4): retires it
    /// and spawns a same-typed replacement, capped by a sliding-window
    /// restart budget. Once the budget is exhausted the agent is left
    /// offline and an `error_occurred` event is emitted instead.
    #[instrument(skip(self))]
    pub async fn recover(&self, swarm_id: SwarmId, agent: &Agent) -> CoordinatorResult<Option<Agent>> {
        if agent.status != AgentStatus::Error {
            return Ok(None);
        }

        let budget_ok = self.check_and_record_restart(&agent.agent_type).await;
        self.agent_pool.retire(agent.id).await?;
        self.events.publish(SystemEvent::AgentRetired {
            swarm_id,
            agent_id: agent.id,
        });

        if !budget_ok {
            warn!(agent_type = %agent.agent_type, "restart budget exhausted, not respawning");
            self.events.publish(SystemEvent::ErrorOccurred {
                swarm_id: Some(swarm_id),
                message: format!(
                    "agent type '{}' exceeded its restart budget of {} within {}s; leaving offline",
                    agent.agent_type, self.config.max_restarts, self.config.restart_window_secs
                ),
            });
            return Ok(None);
        }

        let replacement = self
            .agent_pool
            .spawn(swarm_id, agent.role, &agent.agent_type, agent.capabilities.clone())
            .await?;
        self.events.publish(SystemEvent::AgentSpawned {
            swarm_id,
            agent_id: replacement.id,
            agent_type: replacement.agent_type.clone(),
        });
        info!(agent_type = %agent.agent_type, old = %agent.id, new = %replacement.id, "agent recovered");
        Ok(Some(replacement))
    }

    /// Prunes restarts older than the sliding window, then records this
    /// attempt. Returns `true` if the attempt is within budget.
    async fn check_and_record_restart(&self, agent_type: &str) -> bool {
        let mut log = self.restart_log.lock().await;
        let window = ChronoDuration::seconds(self.config.restart_window_secs);
        let now = Utc::now();
        let history = log.entry(agent_type.to_string()).or_default();
        while history.front().is_some_and(|t| now.signed_duration_since(*t) > window) {
            history.pop_front();
        }

        if history.len() >= self.config.max_restarts {
            return false;
        }
        history.push_back(now);
        true
    }

    /// Scans `swarm_id` for agents in `error` and recovers each (helper
    /// the run loop drives each tick; also callable directly).
    async fn recover_errored(&self, swarm_id: SwarmId) -> CoordinatorResult<usize> {
        let errored = self
            .agent_pool
            .list(AgentFilter {
                swarm_id: Some(swarm_id),
                status: Some(AgentStatus::Error),
                agent_type: None,
            })
            .await?;
        let mut recovered = 0;
        for agent in &errored {
            if self.recover(swarm_id, agent).await?.is_some() {
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    /// Runs the auto-scale / recovery tick for one swarm until
    /// `cancellation` fires.
    pub async fn run(self: Arc<Self>, swarm_id: SwarmId, cancellation: CancellationToken) {
        let tick = std::time::Duration::from_millis(self.config.autoscale_tick_ms);
        loop {
            tokio::select! {
                () = cancellation.cancelled() => {
                    info!(swarm_id = %swarm_id, "queen tick shutting down");
                    return;
                }
                () = tokio::time::sleep(tick) => {}
            }

            if let Err(err) = self.recover_errored(swarm_id).await {
                warn!(swarm_id = %swarm_id, error = %err, "error recovery pass failed");
            }
            if let Err(err) = self.autoscale(swarm_id).await {
                warn!(swarm_id = %swarm_id, error = %err, "autoscale pass failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::{InMemoryAgentRepository, InMemorySwarmRepository, InMemoryTaskRepository};
    use crate::domain::models::{Capability, SchedulerConfig, Task};
    use crate::services::bus::Bus;
    use crate::services::scheduler::Scheduler;

    /// Builds a pool wired to its own throwaway scheduler, matching
    /// `Coordinator::initialize`'s construction order.
    fn test_pool(
        agents: Arc<InMemoryAgentRepository>,
        tasks: Arc<InMemoryTaskRepository>,
    ) -> Arc<AgentPool> {
        let bus = Arc::new(Bus::new());
        let scheduler = Arc::new(Scheduler::new(
            tasks,
            agents.clone(),
            bus.clone(),
            Arc::new(EventBus::new()),
            AgentTypeCatalog::default_general_purpose(),
            SchedulerConfig::default(),
        ));
        Arc::new(AgentPool::new(
            agents,
            bus,
            AgentTypeCatalog::default_general_purpose(),
            scheduler,
            CancellationToken::new(),
        ))
    }

    fn queen() -> (
        Arc<Queen>,
        Arc<InMemorySwarmRepository>,
        Arc<InMemoryTaskRepository>,
        Arc<InMemoryAgentRepository>,
    ) {
        let swarms = Arc::new(InMemorySwarmRepository::new());
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new());
        let pool = test_pool(agents.clone(), tasks.clone());
        let queen = Arc::new(Queen::new(
            swarms.clone(),
            tasks.clone(),
            pool,
            Arc::new(EventBus::new()),
            QueenConfig::default(),
        ));
        (queen, swarms, tasks, agents)
    }

    async fn seeded_swarm(swarms: &InMemorySwarmRepository, max_agents: usize) -> SwarmId {
        let swarm = Swarm::new("build a website", Topology::Hierarchical, max_agents);
        let id = swarm.id;
        swarms.create(&swarm).await.unwrap();
        id
    }

    #[test]
    fn topology_choice_delegates_to_the_keyword_heuristic() {
        assert_eq!(Queen::choose_topology("research the market"), Topology::Mesh);
    }

    #[tokio::test]
    async fn seed_spawns_a_queen_and_bounded_worker_mix_then_activates_the_swarm() {
        let (queen, swarms, ..) = queen();
        let swarm_id = seeded_swarm(&swarms, 3).await;

        let spawned = queen.seed(swarm_id, 3).await.unwrap();
        assert_eq!(spawned.len(), 3);
        assert_eq!(spawned[0].role, AgentRole::Queen);

        let swarm = swarms.get(swarm_id).await.unwrap().unwrap();
        assert_eq!(swarm.status, crate::domain::models::SwarmStatus::Active);
    }

    #[tokio::test]
    async fn autoscale_spawns_a_worker_when_pending_far_exceeds_idle() {
        let (queen, swarms, tasks, _agents) = queen();
        let swarm_id = seeded_swarm(&swarms, 10).await;
        queen.seed(swarm_id, 1).await.unwrap();

        for _ in 0..5 {
            tasks.create(&Task::new(swarm_id, "implement the feature")).await.unwrap();
        }

        let action = queen.autoscale(swarm_id).await.unwrap();
        assert!(matches!(action, Some(ScaleAction::ScaledUp(_))));
    }

    #[tokio::test]
    async fn autoscale_does_nothing_when_disabled() {
        let swarms = Arc::new(InMemorySwarmRepository::new());
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new());
        let pool = test_pool(agents.clone(), tasks.clone());
        let queen = Queen::new(
            swarms.clone(),
            tasks.clone(),
            pool,
            Arc::new(EventBus::new()),
            QueenConfig {
                autoscale_enabled: false,
                ..QueenConfig::default()
            },
        );
        let swarm_id = seeded_swarm(&swarms, 10).await;
        for _ in 0..5 {
            tasks.create(&Task::new(swarm_id, "implement the feature")).await.unwrap();
        }
        assert_eq!(queen.autoscale(swarm_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn recover_respawns_an_errored_agent_of_the_same_type() {
        let (queen, swarms, _tasks, agents) = queen();
        let swarm_id = seeded_swarm(&swarms, 10).await;
        let mut agent = Agent::new(swarm_id, AgentRole::Worker, "coder", [Capability::new("code")]);
        agent.error_task();
        agents.create(&agent).await.unwrap();

        let replacement = queen.recover(swarm_id, &agent).await.unwrap();
        assert!(replacement.is_some());
        let replacement = replacement.unwrap();
        assert_eq!(replacement.agent_type, "coder");
        assert_ne!(replacement.id, agent.id);

        let old = agents.get(agent.id).await.unwrap().unwrap();
        assert_eq!(old.status, AgentStatus::Offline);
    }

    #[tokio::test]
    async fn recover_stops_respawning_once_the_restart_budget_is_exhausted() {
        let swarms = Arc::new(InMemorySwarmRepository::new());
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new());
        let pool = test_pool(agents.clone(), tasks.clone());
        let queen = Queen::new(
            swarms.clone(),
            tasks.clone(),
            pool,
            Arc::new(EventBus::new()),
            QueenConfig {
                max_restarts: 1,
                ..QueenConfig::default()
            },
        );
        let swarm_id = seeded_swarm(&swarms, 10).await;

        let mut first = Agent::new(swarm_id, AgentRole::Worker, "coder", []);
        first.error_task();
        agents.create(&first).await.unwrap();
        let replacement = queen.recover(swarm_id, &first).await.unwrap().unwrap();

        let mut second = replacement;
        second.error_task();
        agents.update(&second).await.unwrap();
        let second_recovery = queen.recover(swarm_id, &second).await.unwrap();
        assert!(second_recovery.is_none());

        let final_agent = agents.get(second.id).await.unwrap().unwrap();
        assert_eq!(final_agent.status, AgentStatus::Offline);
    }
}
