//! SQLite implementation of the `AgentRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{Agent, AgentId, AgentRole, AgentStatus, Capability, SwarmId, TaskId};
use crate::domain::ports::{AgentFilter, AgentRepository};

#[derive(Clone)]
pub struct SqliteAgentRepository {
    pool: SqlitePool,
}

impl SqliteAgentRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    async fn create(&self, agent: &Agent) -> CoordinatorResult<()> {
        let capabilities_json = serde_json::to_string(&agent.capabilities)?;

        sqlx::query(
            r"INSERT INTO agents (id, swarm_id, role, agent_type, status, capabilities_json,
               current_task_id, tasks_completed, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(agent.id.0.to_string())
        .bind(agent.swarm_id.0.to_string())
        .bind(agent.role.as_str())
        .bind(&agent.agent_type)
        .bind(agent.status.as_str())
        .bind(&capabilities_json)
        .bind(agent.current_task_id.map(|id| id.0.to_string()))
        .bind(agent.tasks_completed as i64)
        .bind(agent.created_at.to_rfc3339())
        .bind(agent.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: AgentId) -> CoordinatorResult<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as("SELECT * FROM agents WHERE id = ?")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, agent: &Agent) -> CoordinatorResult<()> {
        let capabilities_json = serde_json::to_string(&agent.capabilities)?;

        let result = sqlx::query(
            r"UPDATE agents SET status = ?, capabilities_json = ?, current_task_id = ?,
               tasks_completed = ?, updated_at = ?
               WHERE id = ?",
        )
        .bind(agent.status.as_str())
        .bind(&capabilities_json)
        .bind(agent.current_task_id.map(|id| id.0.to_string()))
        .bind(agent.tasks_completed as i64)
        .bind(agent.updated_at.to_rfc3339())
        .bind(agent.id.0.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoordinatorError::UnknownEntity {
                kind: "agent",
                id: agent.id.to_string(),
            });
        }

        Ok(())
    }

    async fn list(&self, filter: AgentFilter) -> CoordinatorResult<Vec<Agent>> {
        let mut sql = String::from("SELECT * FROM agents WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(swarm_id) = &filter.swarm_id {
            sql.push_str(" AND swarm_id = ?");
            bindings.push(swarm_id.0.to_string());
        }
        if let Some(status) = &filter.status {
            sql.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }
        if let Some(agent_type) = &filter.agent_type {
            sql.push_str(" AND agent_type = ?");
            bindings.push(agent_type.clone());
        }

        sql.push_str(" ORDER BY created_at");

        let mut q = sqlx::query_as::<_, AgentRow>(&sql);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<AgentRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_idle(&self, swarm_id: SwarmId) -> CoordinatorResult<Vec<Agent>> {
        let rows: Vec<AgentRow> = sqlx::query_as(
            "SELECT * FROM agents WHERE swarm_id = ? AND status = 'idle' ORDER BY created_at",
        )
        .bind(swarm_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_live_by_type(&self, swarm_id: SwarmId) -> CoordinatorResult<HashMap<String, usize>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT agent_type, COUNT(*) FROM agents WHERE swarm_id = ? AND status != 'offline' \
             GROUP BY agent_type",
        )
        .bind(swarm_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(t, c)| (t, c as usize)).collect())
    }
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    swarm_id: String,
    role: String,
    agent_type: String,
    status: String,
    capabilities_json: Option<String>,
    current_task_id: Option<String>,
    tasks_completed: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AgentRow> for Agent {
    type Error = CoordinatorError;

    fn try_from(row: AgentRow) -> Result<Self, Self::Error> {
        let id = AgentId(super::parse_uuid(&row.id)?);
        let swarm_id = SwarmId(super::parse_uuid(&row.swarm_id)?);
        let current_task_id = super::parse_optional_uuid(row.current_task_id)?.map(TaskId);

        let role = AgentRole::parse_str(&row.role)
            .ok_or_else(|| CoordinatorError::Serialization(format!("invalid role: {}", row.role)))?;
        let status = AgentStatus::parse_str(&row.status).ok_or_else(|| {
            CoordinatorError::Serialization(format!("invalid status: {}", row.status))
        })?;
        let capabilities: std::collections::HashSet<Capability> =
            super::parse_json_or_default(row.capabilities_json)?;

        let created_at = super::parse_datetime(&row.created_at)?;
        let updated_at = super::parse_datetime(&row.updated_at)?;

        Ok(Self {
            id,
            swarm_id,
            role,
            agent_type: row.agent_type,
            status,
            capabilities,
            current_task_id,
            tasks_completed: row.tasks_completed as u64,
            created_at,
            updated_at,
        })
    }
}
