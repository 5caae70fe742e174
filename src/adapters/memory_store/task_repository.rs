//! In-memory `TaskRepository` fallback.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{SwarmId, Task, TaskId, TaskStatus};
use crate::domain::ports::{TaskFilter, TaskRepository};

#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &Task) -> CoordinatorResult<()> {
        self.tasks.write().insert(task.id, task.clone());
        Ok(())
    }

    async fn get(&self, id: TaskId) -> CoordinatorResult<Option<Task>> {
        Ok(self.tasks.read().get(&id).cloned())
    }

    async fn update(&self, task: &Task) -> CoordinatorResult<()> {
        let mut tasks = self.tasks.write();
        if !tasks.contains_key(&task.id) {
            return Err(CoordinatorError::UnknownEntity {
                kind: "task",
                id: task.id.to_string(),
            });
        }
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn list(&self, filter: TaskFilter) -> CoordinatorResult<Vec<Task>> {
        let out = self
            .tasks
            .read()
            .values()
            .filter(|t| filter.swarm_id.is_none_or(|want| t.swarm_id == want))
            .filter(|t| filter.status.is_none_or(|want| t.status == want))
            .cloned()
            .collect();
        Ok(out)
    }

    async fn list_ready(&self, swarm_id: SwarmId, limit: usize) -> CoordinatorResult<Vec<Task>> {
        let tasks = self.tasks.read();
        let mut candidates: Vec<Task> = tasks
            .values()
            .filter(|t| {
                t.swarm_id == swarm_id
                    && t.status == TaskStatus::Pending
                    && t.dependencies.iter().all(|dep_id| {
                        tasks.get(dep_id).is_some_and(|dep| {
                            dep.status == TaskStatus::Completed
                                || (dep.status == TaskStatus::Failed
                                    && dep.skips_dependents_on_failure())
                        })
                    })
            })
            .cloned()
            .collect();

        candidates.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then(a.created_at.cmp(&b.created_at))
        });
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn count_by_status(
        &self,
        swarm_id: SwarmId,
    ) -> CoordinatorResult<HashMap<TaskStatus, u64>> {
        let mut counts = HashMap::new();
        for task in self.tasks.read().values() {
            if task.swarm_id == swarm_id {
                *counts.entry(task.status).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskPriority;

    #[tokio::test]
    async fn list_ready_excludes_tasks_with_incomplete_dependencies() {
        let repo = InMemoryTaskRepository::new();
        let swarm_id = SwarmId::new();
        let blocker = Task::new(swarm_id, "blocker");
        let blocked = Task::new(swarm_id, "blocked").with_dependency(blocker.id);

        repo.create(&blocker).await.unwrap();
        repo.create(&blocked).await.unwrap();

        assert!(repo.list_ready(swarm_id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_ready_orders_by_priority_then_age() {
        let repo = InMemoryTaskRepository::new();
        let swarm_id = SwarmId::new();
        let low = Task::new(swarm_id, "low").with_priority(TaskPriority::Low);
        let high = Task::new(swarm_id, "high").with_priority(TaskPriority::High);

        repo.create(&low).await.unwrap();
        repo.create(&high).await.unwrap();

        let ready = repo.list_ready(swarm_id, 10).await.unwrap();
        assert_eq!(ready[0].description, "high");
    }

    #[tokio::test]
    async fn list_ready_treats_skip_on_failure_dependency_as_satisfied() {
        let repo = InMemoryTaskRepository::new();
        let swarm_id = SwarmId::new();
        let mut blocker = Task::new(swarm_id, "blocker")
            .with_on_failure(crate::domain::models::OnFailure::Skip);
        blocker.fail("boom");
        let blocked = Task::new(swarm_id, "blocked").with_dependency(blocker.id);

        repo.create(&blocker).await.unwrap();
        repo.create(&blocked).await.unwrap();

        let ready = repo.list_ready(swarm_id, 10).await.unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].description, "blocked");
    }
}
