//! SQLite implementation of the `ConsensusRepository`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{AgentId, ConsensusAlgorithm, ConsensusResult, Proposal, ProposalId, ProposalStatus, SwarmId, Vote};
use crate::domain::ports::ConsensusRepository;

#[derive(Clone)]
pub struct SqliteConsensusRepository {
    pool: SqlitePool,
}

impl SqliteConsensusRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConsensusRepository for SqliteConsensusRepository {
    async fn create(&self, proposal: &Proposal) -> CoordinatorResult<()> {
        let options_json = serde_json::to_string(&proposal.options)?;
        let eligible_voters_json = serde_json::to_string(&proposal.eligible_voters)?;
        let votes_json = serde_json::to_string(&proposal.votes)?;
        let result_json = proposal
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r"INSERT INTO consensus_decisions (id, swarm_id, description, options_json, algorithm,
               eligible_voters_json, votes_json, status, result_json, deadline, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(proposal.id.0.to_string())
        .bind(proposal.swarm_id.0.to_string())
        .bind(&proposal.description)
        .bind(&options_json)
        .bind(proposal.algorithm.as_str())
        .bind(&eligible_voters_json)
        .bind(&votes_json)
        .bind(proposal.status.as_str())
        .bind(&result_json)
        .bind(proposal.deadline.to_rfc3339())
        .bind(proposal.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: ProposalId) -> CoordinatorResult<Option<Proposal>> {
        let row: Option<ProposalRow> =
            sqlx::query_as("SELECT * FROM consensus_decisions WHERE id = ?")
                .bind(id.0.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, proposal: &Proposal) -> CoordinatorResult<()> {
        let votes_json = serde_json::to_string(&proposal.votes)?;
        let result_json = proposal
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            "UPDATE consensus_decisions SET votes_json = ?, status = ?, result_json = ? WHERE id = ?",
        )
        .bind(&votes_json)
        .bind(proposal.status.as_str())
        .bind(&result_json)
        .bind(proposal.id.0.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoordinatorError::UnknownEntity {
                kind: "proposal",
                id: proposal.id.to_string(),
            });
        }

        Ok(())
    }

    async fn list(
        &self,
        swarm_id: SwarmId,
        status: Option<ProposalStatus>,
    ) -> CoordinatorResult<Vec<Proposal>> {
        let rows: Vec<ProposalRow> = if let Some(status) = status {
            sqlx::query_as(
                "SELECT * FROM consensus_decisions WHERE swarm_id = ? AND status = ? \
                 ORDER BY created_at DESC",
            )
            .bind(swarm_id.0.to_string())
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                "SELECT * FROM consensus_decisions WHERE swarm_id = ? ORDER BY created_at DESC",
            )
            .bind(swarm_id.0.to_string())
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_expired_open(&self) -> CoordinatorResult<Vec<Proposal>> {
        let rows: Vec<ProposalRow> = sqlx::query_as(
            "SELECT * FROM consensus_decisions WHERE status = 'open' AND deadline <= ?",
        )
        .bind(Utc::now().to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ProposalRow {
    id: String,
    swarm_id: String,
    description: String,
    options_json: String,
    algorithm: String,
    eligible_voters_json: String,
    votes_json: String,
    status: String,
    result_json: Option<String>,
    deadline: String,
    created_at: String,
}

impl TryFrom<ProposalRow> for Proposal {
    type Error = CoordinatorError;

    fn try_from(row: ProposalRow) -> Result<Self, Self::Error> {
        let id = ProposalId(super::parse_uuid(&row.id)?);
        let swarm_id = SwarmId(super::parse_uuid(&row.swarm_id)?);

        let algorithm = ConsensusAlgorithm::parse_str(&row.algorithm).ok_or_else(|| {
            CoordinatorError::Serialization(format!("invalid algorithm: {}", row.algorithm))
        })?;
        let status = ProposalStatus::parse_str(&row.status).ok_or_else(|| {
            CoordinatorError::Serialization(format!("invalid status: {}", row.status))
        })?;

        let options: Vec<String> = serde_json::from_str(&row.options_json)?;
        let eligible_voters: Vec<AgentId> = serde_json::from_str(&row.eligible_voters_json)?;
        let votes: std::collections::HashMap<AgentId, Vote> =
            serde_json::from_str(&row.votes_json)?;
        let result: Option<ConsensusResult> = row
            .result_json
            .map(|s| serde_json::from_str(&s))
            .transpose()?;

        Ok(Self {
            id,
            swarm_id,
            description: row.description,
            options,
            algorithm,
            eligible_voters,
            votes,
            status,
            result,
            deadline: super::parse_datetime(&row.deadline)?,
            created_at: super::parse_datetime(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use chrono::Duration;

    async fn setup() -> (SqliteConsensusRepository, SwarmId) {
        let pool = create_migrated_test_pool().await.unwrap();
        sqlx::query(
            "INSERT INTO swarms (id, objective, topology, status, max_agents, created_at) \
             VALUES (?, 'obj', 'hierarchical', 'active', 8, ?)",
        )
        .bind("00000000-0000-0000-0000-000000000003")
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();
        let swarm_id = SwarmId(uuid::uuid!("00000000-0000-0000-0000-000000000003"));
        (SqliteConsensusRepository::new(pool), swarm_id)
    }

    #[tokio::test]
    async fn create_and_get_round_trips_a_proposal() {
        let (repo, swarm_id) = setup().await;
        let proposal = Proposal::new(
            swarm_id,
            "pick one",
            vec!["a".into(), "b".into()],
            ConsensusAlgorithm::Majority,
            vec![AgentId::new()],
            Utc::now() + Duration::seconds(30),
        );

        repo.create(&proposal).await.unwrap();
        let fetched = repo.get(proposal.id).await.unwrap().unwrap();
        assert_eq!(fetched.options, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(fetched.status, ProposalStatus::Open);
    }

    #[tokio::test]
    async fn update_persists_cast_votes() {
        let (repo, swarm_id) = setup().await;
        let voter = AgentId::new();
        let mut proposal = Proposal::new(
            swarm_id,
            "pick one",
            vec!["a".into()],
            ConsensusAlgorithm::Majority,
            vec![voter],
            Utc::now() + Duration::seconds(30),
        );
        repo.create(&proposal).await.unwrap();

        proposal.cast_vote(voter, "a".into());
        repo.update(&proposal).await.unwrap();

        let fetched = repo.get(proposal.id).await.unwrap().unwrap();
        assert_eq!(fetched.votes.len(), 1);
    }

    #[tokio::test]
    async fn list_expired_open_finds_past_deadline_proposals() {
        let (repo, swarm_id) = setup().await;
        let expired = Proposal::new(
            swarm_id,
            "stale",
            vec!["a".into()],
            ConsensusAlgorithm::Majority,
            vec![AgentId::new()],
            Utc::now() - Duration::seconds(5),
        );
        repo.create(&expired).await.unwrap();

        let found = repo.list_expired_open().await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
