//! SQLite implementation of the `MemoryRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{MemoryEntry, RetentionPolicy};
use crate::domain::ports::MemoryRepository;

#[derive(Clone)]
pub struct SqliteMemoryRepository {
    pool: SqlitePool,
}

impl SqliteMemoryRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemoryRepository for SqliteMemoryRepository {
    async fn put(&self, entry: &MemoryEntry) -> CoordinatorResult<()> {
        let value_json = serde_json::to_string(&entry.value)?;
        let retention_json = serde_json::to_string(&entry.retention)?;

        sqlx::query(
            r"INSERT INTO collective_memory (namespace, key, value_json, retention_json,
               created_at, expires_at, access_count, last_access_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(namespace, key) DO UPDATE SET
                   value_json = excluded.value_json,
                   retention_json = excluded.retention_json,
                   created_at = excluded.created_at,
                   expires_at = excluded.expires_at,
                   access_count = excluded.access_count,
                   last_access_at = excluded.last_access_at",
        )
        .bind(&entry.namespace)
        .bind(&entry.key)
        .bind(&value_json)
        .bind(&retention_json)
        .bind(entry.created_at.to_rfc3339())
        .bind(entry.expires_at.map(|t| t.to_rfc3339()))
        .bind(entry.access_count as i64)
        .bind(entry.last_access_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> CoordinatorResult<Option<MemoryEntry>> {
        let row: Option<MemoryRow> =
            sqlx::query_as("SELECT * FROM collective_memory WHERE namespace = ? AND key = ?")
                .bind(namespace)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn record_access(&self, namespace: &str, key: &str) -> CoordinatorResult<()> {
        let result = sqlx::query(
            r"UPDATE collective_memory SET access_count = access_count + 1, last_access_at = ?
               WHERE namespace = ? AND key = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(namespace)
        .bind(key)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoordinatorError::UnknownEntity {
                kind: "memory_entry",
                id: format!("{namespace}/{key}"),
            });
        }

        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> CoordinatorResult<()> {
        sqlx::query("DELETE FROM collective_memory WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_namespace(&self, namespace: &str) -> CoordinatorResult<Vec<MemoryEntry>> {
        let rows: Vec<MemoryRow> =
            sqlx::query_as("SELECT * FROM collective_memory WHERE namespace = ? ORDER BY key")
                .bind(namespace)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> CoordinatorResult<u64> {
        let result = sqlx::query(
            "DELETE FROM collective_memory WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn evict_oversized(&self, namespace: &str, max_entries: usize) -> CoordinatorResult<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM collective_memory WHERE namespace = ?")
                .bind(namespace)
                .fetch_one(&self.pool)
                .await?;

        let count = count as usize;
        if count <= max_entries {
            return Ok(0);
        }
        let overflow = count - max_entries;

        let result = sqlx::query(
            r"DELETE FROM collective_memory WHERE rowid IN (
                   SELECT rowid FROM collective_memory WHERE namespace = ?
                   ORDER BY COALESCE(last_access_at, created_at) ASC
                   LIMIT ?
               )",
        )
        .bind(namespace)
        .bind(overflow as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct MemoryRow {
    namespace: String,
    key: String,
    value_json: String,
    retention_json: String,
    created_at: String,
    expires_at: Option<String>,
    access_count: i64,
    last_access_at: Option<String>,
}

impl TryFrom<MemoryRow> for MemoryEntry {
    type Error = CoordinatorError;

    fn try_from(row: MemoryRow) -> Result<Self, Self::Error> {
        let value: serde_json::Value = serde_json::from_str(&row.value_json)?;
        let retention: RetentionPolicy = serde_json::from_str(&row.retention_json)?;

        Ok(Self {
            namespace: row.namespace,
            key: row.key,
            value,
            retention,
            created_at: super::parse_datetime(&row.created_at)?,
            expires_at: super::parse_optional_datetime(row.expires_at)?,
            access_count: row.access_count as u64,
            last_access_at: super::parse_optional_datetime(row.last_access_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup() -> SqliteMemoryRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteMemoryRepository::new(pool)
    }

    #[tokio::test]
    async fn put_and_get_round_trips_an_entry() {
        let repo = setup().await;
        let entry = MemoryEntry::new(
            "swarm:1:findings",
            "k1",
            serde_json::json!({"result": 42}),
            RetentionPolicy::Persistent,
        );

        repo.put(&entry).await.unwrap();
        let fetched = repo.get("swarm:1:findings", "k1").await.unwrap().unwrap();
        assert_eq!(fetched.value, serde_json::json!({"result": 42}));
    }

    #[tokio::test]
    async fn put_overwrites_existing_key() {
        let repo = setup().await;
        let entry = MemoryEntry::new("ns", "k", serde_json::json!(1), RetentionPolicy::Persistent);
        repo.put(&entry).await.unwrap();

        let updated = MemoryEntry::new("ns", "k", serde_json::json!(2), RetentionPolicy::Persistent);
        repo.put(&updated).await.unwrap();

        let fetched = repo.get("ns", "k").await.unwrap().unwrap();
        assert_eq!(fetched.value, serde_json::json!(2));
    }

    #[tokio::test]
    async fn delete_expired_removes_only_past_entries() {
        let repo = setup().await;
        let expired = MemoryEntry::new(
            "ns",
            "old",
            serde_json::json!(1),
            RetentionPolicy::TimeBased { ttl_secs: -1 },
        );
        let fresh = MemoryEntry::new(
            "ns",
            "new",
            serde_json::json!(1),
            RetentionPolicy::TimeBased { ttl_secs: 3600 },
        );
        repo.put(&expired).await.unwrap();
        repo.put(&fresh).await.unwrap();

        let removed = repo.delete_expired(Utc::now()).await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get("ns", "new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn evict_oversized_keeps_most_recently_accessed() {
        let repo = setup().await;
        for i in 0..5 {
            let entry = MemoryEntry::new(
                "bounded",
                format!("k{i}"),
                serde_json::json!(i),
                RetentionPolicy::SizeBased { max_entries: 3 },
            );
            repo.put(&entry).await.unwrap();
        }

        let removed = repo.evict_oversized("bounded", 3).await.unwrap();
        assert_eq!(removed, 2);
        let remaining = repo.list_namespace("bounded").await.unwrap();
        assert_eq!(remaining.len(), 3);
    }

    #[tokio::test]
    async fn record_access_updates_counter() {
        let repo = setup().await;
        let entry = MemoryEntry::new("ns", "k", serde_json::json!(1), RetentionPolicy::Persistent);
        repo.put(&entry).await.unwrap();
        repo.record_access("ns", "k").await.unwrap();

        let fetched = repo.get("ns", "k").await.unwrap().unwrap();
        assert_eq!(fetched.access_count, 1);
        assert!(fetched.last_access_at.is_some());
    }
}
