//! Task repository port.

use async_trait::async_trait;

use crate::domain::errors::CoordinatorResult;
use crate::domain::models::{SwarmId, Task, TaskId, TaskStatus};

/// Filter criteria for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Restrict to a single swarm.
    pub swarm_id: Option<SwarmId>,
    /// Restrict to a single status.
    pub status: Option<TaskStatus>,
}

/// Repository interface for `Task` persistence.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Creates a new task.
    async fn create(&self, task: &Task) -> CoordinatorResult<()>;

    /// Fetches a task by id.
    async fn get(&self, id: TaskId) -> CoordinatorResult<Option<Task>>;

    /// Persists an updated task.
    async fn update(&self, task: &Task) -> CoordinatorResult<()>;

    /// Lists tasks matching the given filter.
    async fn list(&self, filter: TaskFilter) -> CoordinatorResult<Vec<Task>>;

    /// Lists tasks in `pending` status whose dependencies have all
    /// completed, ordered by `(priority desc, created_at asc)` — the
    /// Scheduler's ready queue (§4.5).
    async fn list_ready(&self, swarm_id: SwarmId, limit: usize) -> CoordinatorResult<Vec<Task>>;

    /// Counts tasks in a swarm grouped by status, for the `status` and
    /// `metrics` command surface.
    async fn count_by_status(
        &self,
        swarm_id: SwarmId,
    ) -> CoordinatorResult<std::collections::HashMap<TaskStatus, u64>>;
}
