//! SQLite implementation of the `SwarmRepository`.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{QueenMode, Swarm, SwarmId, SwarmStatus, Topology};
use crate::domain::ports::SwarmRepository;

#[derive(Clone)]
pub struct SqliteSwarmRepository {
    pool: SqlitePool,
}

impl SqliteSwarmRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SwarmRepository for SqliteSwarmRepository {
    async fn create(&self, swarm: &Swarm) -> CoordinatorResult<()> {
        sqlx::query(
            r"INSERT INTO swarms (id, name, objective, topology, queen_mode, status, max_agents,
               created_at, updated_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(swarm.id.0.to_string())
        .bind(&swarm.name)
        .bind(&swarm.objective)
        .bind(swarm.topology.as_str())
        .bind(swarm.queen_mode.as_str())
        .bind(swarm.status.as_str())
        .bind(swarm.max_agents as i64)
        .bind(swarm.created_at.to_rfc3339())
        .bind(swarm.updated_at.to_rfc3339())
        .bind(swarm.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: SwarmId) -> CoordinatorResult<Option<Swarm>> {
        let row: Option<SwarmRow> = sqlx::query_as("SELECT * FROM swarms WHERE id = ?")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, swarm: &Swarm) -> CoordinatorResult<()> {
        let result = sqlx::query(
            "UPDATE swarms SET name = ?, status = ?, updated_at = ?, completed_at = ? WHERE id = ?",
        )
        .bind(&swarm.name)
        .bind(swarm.status.as_str())
        .bind(swarm.updated_at.to_rfc3339())
        .bind(swarm.completed_at.map(|t| t.to_rfc3339()))
        .bind(swarm.id.0.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoordinatorError::UnknownEntity {
                kind: "swarm",
                id: swarm.id.to_string(),
            });
        }

        Ok(())
    }

    async fn list(&self, status: Option<SwarmStatus>) -> CoordinatorResult<Vec<Swarm>> {
        let rows: Vec<SwarmRow> = if let Some(status) = status {
            sqlx::query_as("SELECT * FROM swarms WHERE status = ? ORDER BY created_at DESC")
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as("SELECT * FROM swarms ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct SwarmRow {
    id: String,
    name: String,
    objective: String,
    topology: String,
    queen_mode: String,
    status: String,
    max_agents: i64,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl TryFrom<SwarmRow> for Swarm {
    type Error = CoordinatorError;

    fn try_from(row: SwarmRow) -> Result<Self, Self::Error> {
        let id = SwarmId(super::parse_uuid(&row.id)?);
        let topology = Topology::parse_str(&row.topology).ok_or_else(|| {
            CoordinatorError::Serialization(format!("invalid topology: {}", row.topology))
        })?;
        let queen_mode = QueenMode::parse_str(&row.queen_mode).ok_or_else(|| {
            CoordinatorError::Serialization(format!("invalid queen_mode: {}", row.queen_mode))
        })?;
        let status = SwarmStatus::parse_str(&row.status).ok_or_else(|| {
            CoordinatorError::Serialization(format!("invalid status: {}", row.status))
        })?;

        Ok(Self {
            id,
            name: row.name,
            objective: row.objective,
            topology,
            queen_mode,
            status,
            max_agents: row.max_agents as usize,
            created_at: super::parse_datetime(&row.created_at)?,
            updated_at: super::parse_datetime(&row.updated_at)?,
            completed_at: super::parse_optional_datetime(row.completed_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup() -> SqliteSwarmRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteSwarmRepository::new(pool)
    }

    #[tokio::test]
    async fn create_and_get_round_trips_a_swarm() {
        let repo = setup().await;
        let swarm = Swarm::new("build the thing", Topology::Hierarchical, 8);

        repo.create(&swarm).await.unwrap();
        let fetched = repo.get(swarm.id).await.unwrap().unwrap();
        assert_eq!(fetched.objective, "build the thing");
        assert_eq!(fetched.status, SwarmStatus::Initializing);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let repo = setup().await;
        let mut terminated = Swarm::new("finished objective", Topology::Mesh, 4);
        terminated.activate();
        terminated.begin_shutdown();
        terminated.terminate();
        let active = Swarm::new("still going", Topology::Hierarchical, 4);

        repo.create(&terminated).await.unwrap();
        repo.create(&active).await.unwrap();

        let found = repo.list(Some(SwarmStatus::Terminated)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].objective, "finished objective");
    }

    #[tokio::test]
    async fn update_unknown_swarm_is_an_error() {
        let repo = setup().await;
        let swarm = Swarm::new("ghost", Topology::Hierarchical, 1);
        assert!(matches!(
            repo.update(&swarm).await,
            Err(CoordinatorError::UnknownEntity { .. })
        ));
    }
}
