//! SQLite implementation of the `TaskRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{
    Capability, ExecutionStrategy, OnFailure, SwarmId, Task, TaskId, TaskPriority, TaskStatus,
};
use crate::domain::ports::{TaskFilter, TaskRepository};

/// Emit a warning when a serialized capability/dependency JSON blob
/// exceeds this size; a signal the caller is passing unreasonably large
/// graphs through.
const JSON_SIZE_WARN_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A task is ready when every dependency has reached `completed`.
    async fn dependencies_satisfied(&self, task: &Task) -> CoordinatorResult<bool> {
        if task.dependencies.is_empty() {
            return Ok(true);
        }
        for dep_id in &task.dependencies {
            let row: Option<(String, String)> =
                sqlx::query_as("SELECT status, on_failure FROM tasks WHERE id = ?")
                    .bind(dep_id.0.to_string())
                    .fetch_optional(&self.pool)
                    .await?;
            match row {
                Some((s, _)) if s == "completed" => {}
                Some((s, on_failure)) if s == "failed" && on_failure == "skip" => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> CoordinatorResult<()> {
        let dependencies_json = serde_json::to_string(&task.dependencies)?;
        let required_capabilities_json = serde_json::to_string(&task.required_capabilities)?;
        let assigned_agents_json = serde_json::to_string(&task.assigned_agents)?;
        if dependencies_json.len() > JSON_SIZE_WARN_BYTES {
            tracing::warn!(
                task_id = %task.id,
                size_bytes = dependencies_json.len(),
                "dependencies_json exceeds size threshold"
            );
        }

        sqlx::query(
            r"INSERT INTO tasks (id, swarm_id, description, priority, strategy, status,
               dependencies_json, required_capabilities_json, max_agents, assigned_agents_json,
               require_consensus, retries, max_retries, on_failure, progress, result, error,
               created_at, assigned_at, started_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id.0.to_string())
        .bind(task.swarm_id.0.to_string())
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.strategy.as_str())
        .bind(task.status.as_str())
        .bind(&dependencies_json)
        .bind(&required_capabilities_json)
        .bind(task.max_agents as i64)
        .bind(&assigned_agents_json)
        .bind(task.require_consensus)
        .bind(task.retries as i64)
        .bind(task.max_retries as i64)
        .bind(task.on_failure.as_str())
        .bind(task.progress)
        .bind(&task.result)
        .bind(&task.error)
        .bind(task.created_at.to_rfc3339())
        .bind(task.assigned_at.map(|t| t.to_rfc3339()))
        .bind(task.started_at.map(|t| t.to_rfc3339()))
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: TaskId) -> CoordinatorResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, task: &Task) -> CoordinatorResult<()> {
        let dependencies_json = serde_json::to_string(&task.dependencies)?;
        let required_capabilities_json = serde_json::to_string(&task.required_capabilities)?;
        let assigned_agents_json = serde_json::to_string(&task.assigned_agents)?;

        let result = sqlx::query(
            r"UPDATE tasks SET description = ?, priority = ?, strategy = ?, status = ?,
               dependencies_json = ?, required_capabilities_json = ?, max_agents = ?,
               assigned_agents_json = ?, require_consensus = ?, retries = ?, max_retries = ?,
               on_failure = ?, progress = ?, result = ?,
               error = ?, assigned_at = ?, started_at = ?, completed_at = ?
               WHERE id = ?",
        )
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.strategy.as_str())
        .bind(task.status.as_str())
        .bind(&dependencies_json)
        .bind(&required_capabilities_json)
        .bind(task.max_agents as i64)
        .bind(&assigned_agents_json)
        .bind(task.require_consensus)
        .bind(task.retries as i64)
        .bind(task.max_retries as i64)
        .bind(task.on_failure.as_str())
        .bind(task.progress)
        .bind(&task.result)
        .bind(&task.error)
        .bind(task.assigned_at.map(|t| t.to_rfc3339()))
        .bind(task.started_at.map(|t| t.to_rfc3339()))
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(task.id.0.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoordinatorError::UnknownEntity {
                kind: "task",
                id: task.id.to_string(),
            });
        }

        Ok(())
    }

    async fn list(&self, filter: TaskFilter) -> CoordinatorResult<Vec<Task>> {
        let mut query = String::from("SELECT * FROM tasks WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(swarm_id) = &filter.swarm_id {
            query.push_str(" AND swarm_id = ?");
            bindings.push(swarm_id.0.to_string());
        }
        if let Some(status) = &filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }

        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, TaskRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<TaskRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_ready(&self, swarm_id: SwarmId, limit: usize) -> CoordinatorResult<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r"SELECT * FROM tasks WHERE swarm_id = ? AND status = 'pending'
               ORDER BY CASE priority
                   WHEN 'critical' THEN 1
                   WHEN 'high' THEN 2
                   WHEN 'normal' THEN 3
                   WHEN 'low' THEN 4
               END, created_at",
        )
        .bind(swarm_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut ready = Vec::new();
        for row in rows {
            let task = Task::try_from(row)?;
            if self.dependencies_satisfied(&task).await? {
                ready.push(task);
                if ready.len() >= limit {
                    break;
                }
            }
        }
        Ok(ready)
    }

    async fn count_by_status(
        &self,
        swarm_id: SwarmId,
    ) -> CoordinatorResult<HashMap<TaskStatus, u64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks WHERE swarm_id = ? GROUP BY status")
                .bind(swarm_id.0.to_string())
                .fetch_all(&self.pool)
                .await?;

        let mut counts = HashMap::new();
        for (status_str, count) in rows {
            if let Some(status) = TaskStatus::parse_str(&status_str) {
                counts.insert(status, count as u64);
            }
        }
        Ok(counts)
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    swarm_id: String,
    description: String,
    priority: String,
    strategy: String,
    status: String,
    dependencies_json: Option<String>,
    required_capabilities_json: Option<String>,
    max_agents: i64,
    assigned_agents_json: Option<String>,
    require_consensus: bool,
    retries: i64,
    max_retries: i64,
    on_failure: String,
    progress: f64,
    result: Option<String>,
    error: Option<String>,
    created_at: String,
    assigned_at: Option<String>,
    started_at: Option<String>,
    completed_at: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = CoordinatorError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let id = TaskId(super::parse_uuid(&row.id)?);
        let swarm_id = SwarmId(super::parse_uuid(&row.swarm_id)?);

        let status = TaskStatus::parse_str(&row.status)
            .ok_or_else(|| CoordinatorError::Serialization(format!("invalid status: {}", row.status)))?;
        let priority = TaskPriority::parse_str(&row.priority).ok_or_else(|| {
            CoordinatorError::Serialization(format!("invalid priority: {}", row.priority))
        })?;
        let strategy = ExecutionStrategy::parse_str(&row.strategy).ok_or_else(|| {
            CoordinatorError::Serialization(format!("invalid strategy: {}", row.strategy))
        })?;
        let on_failure = OnFailure::parse_str(&row.on_failure).ok_or_else(|| {
            CoordinatorError::Serialization(format!("invalid on_failure: {}", row.on_failure))
        })?;

        let raw_dependencies: HashSet<uuid::Uuid> =
            super::parse_json_or_default(row.dependencies_json)?;
        let dependencies = raw_dependencies.into_iter().map(TaskId).collect();
        let required_capabilities: HashSet<Capability> =
            super::parse_json_or_default(row.required_capabilities_json)?;
        let assigned_agents = super::parse_json_or_default(row.assigned_agents_json)?;

        let created_at = super::parse_datetime(&row.created_at)?;
        let assigned_at = super::parse_optional_datetime(row.assigned_at)?;
        let started_at = super::parse_optional_datetime(row.started_at)?;
        let completed_at = super::parse_optional_datetime(row.completed_at)?;

        Ok(Self {
            id,
            swarm_id,
            description: row.description,
            priority,
            strategy,
            status,
            dependencies,
            required_capabilities,
            max_agents: row.max_agents as usize,
            assigned_agents,
            require_consensus: row.require_consensus,
            retries: row.retries as u32,
            max_retries: row.max_retries as u32,
            on_failure,
            progress: row.progress,
            result: row.result,
            error: row.error,
            created_at,
            assigned_at,
            started_at,
            completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup() -> (SqliteTaskRepository, SwarmId) {
        let pool = create_migrated_test_pool().await.unwrap();
        sqlx::query(
            "INSERT INTO swarms (id, objective, topology, status, max_agents, created_at) \
             VALUES (?, 'obj', 'hierarchical', 'active', 8, ?)",
        )
        .bind("00000000-0000-0000-0000-000000000001")
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();
        let swarm_id = SwarmId(uuid::uuid!("00000000-0000-0000-0000-000000000001"));
        (SqliteTaskRepository::new(pool), swarm_id)
    }

    #[tokio::test]
    async fn create_and_get_round_trips_a_task() {
        let (repo, swarm_id) = setup().await;
        let task = Task::new(swarm_id, "do a thing").with_priority(TaskPriority::High);

        repo.create(&task).await.unwrap();
        let fetched = repo.get(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.description, "do a thing");
        assert_eq!(fetched.priority, TaskPriority::High);
    }

    #[tokio::test]
    async fn list_ready_orders_by_priority() {
        let (repo, swarm_id) = setup().await;
        let low = Task::new(swarm_id, "low").with_priority(TaskPriority::Low);
        let critical = Task::new(swarm_id, "critical").with_priority(TaskPriority::Critical);
        repo.create(&low).await.unwrap();
        repo.create(&critical).await.unwrap();

        let ready = repo.list_ready(swarm_id, 10).await.unwrap();
        assert_eq!(ready[0].description, "critical");
    }

    #[tokio::test]
    async fn list_ready_treats_skip_on_failure_dependency_as_satisfied() {
        let (repo, swarm_id) = setup().await;
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

    #[tokio::test]
    async fn update_unknown_task_is_an_error() {
        let (repo, swarm_id) = setup().await;
        let task = Task::new(swarm_id, "ghost");
        assert!(matches!(
            repo.update(&task).await,
            Err(CoordinatorError::UnknownEntity { .. })
        ));
    }
}
