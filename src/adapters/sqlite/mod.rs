//! SQLite adapters for the Hive-Mind Coordinator's durable store.

pub mod agent_repository;
pub mod connection;
pub mod consensus_repository;
pub mod memory_repository;
pub mod migrations;
pub mod swarm_repository;
pub mod task_repository;

pub use agent_repository::SqliteAgentRepository;
pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, PoolConfig};
pub use consensus_repository::SqliteConsensusRepository;
pub use memory_repository::SqliteMemoryRepository;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use swarm_repository::SqliteSwarmRepository;
pub use task_repository::SqliteTaskRepository;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};

/// Parses a UUID string from a SQLite row field.
pub fn parse_uuid(s: &str) -> CoordinatorResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| CoordinatorError::Serialization(e.to_string()))
}

/// Parses an optional UUID string from a SQLite row field.
pub fn parse_optional_uuid(s: Option<String>) -> CoordinatorResult<Option<Uuid>> {
    s.map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| CoordinatorError::Serialization(e.to_string()))
}

/// Parses an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> CoordinatorResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| CoordinatorError::Serialization(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses an optional RFC3339 datetime string from a SQLite row field.
pub fn parse_optional_datetime(s: Option<String>) -> CoordinatorResult<Option<DateTime<Utc>>> {
    s.map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| CoordinatorError::Serialization(e.to_string()))
}

/// Parses a JSON string from a SQLite row field, falling back to the
/// type's default when the column is `NULL`.
pub fn parse_json_or_default<T: serde::de::DeserializeOwned + Default>(
    s: Option<String>,
) -> CoordinatorResult<T> {
    s.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| CoordinatorError::Serialization(e.to_string()))
        .map(|opt| opt.unwrap_or_default())
}

/// Errors that can occur while bringing up the durable store.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to open or pool a connection.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
    /// Failed to apply an embedded migration.
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),
    /// A query failed outside of migration/connection setup.
    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),
}

/// Opens (creating if needed) and migrates the database at `database_url`.
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, None).await?;
    let migrator = Migrator::new(pool.clone());
    migrator
        .run_embedded_migrations(all_embedded_migrations())
        .await?;
    Ok(pool)
}

/// Opens the default project-local database at `.hivemind/hivemind.db`.
pub async fn initialize_default_database() -> Result<SqlitePool, DatabaseError> {
    initialize_database("sqlite:.hivemind/hivemind.db").await
}

/// Creates an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator
        .run_embedded_migrations(all_embedded_migrations())
        .await?;
    Ok(pool)
}
