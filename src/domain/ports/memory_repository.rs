//! Collective memory repository port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::CoordinatorResult;
use crate::domain::models::MemoryEntry;

/// Repository interface for `MemoryEntry` persistence.
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    /// Inserts or overwrites an entry.
    async fn put(&self, entry: &MemoryEntry) -> CoordinatorResult<()>;

    /// Fetches an entry by namespace and key.
    async fn get(&self, namespace: &str, key: &str) -> CoordinatorResult<Option<MemoryEntry>>;

    /// Records a read against the stored entry (bumps `access_count` and
    /// `last_access_at`).
    async fn record_access(&self, namespace: &str, key: &str) -> CoordinatorResult<()>;

    /// Deletes an entry.
    async fn delete(&self, namespace: &str, key: &str) -> CoordinatorResult<()>;

    /// Lists every entry in a namespace.
    async fn list_namespace(&self, namespace: &str) -> CoordinatorResult<Vec<MemoryEntry>>;

    /// Deletes every entry whose `expires_at` is at or before `now`;
    /// returns the number removed. Drives the periodic expiry sweep
    /// (§4.2.2).
    async fn delete_expired(&self, now: DateTime<Utc>) -> CoordinatorResult<u64>;

    /// For namespaces under a `SizeBased` policy, evicts the
    /// least-recently-accessed entries needed to bring the namespace back
    /// under its cap; returns the number removed.
    async fn evict_oversized(&self, namespace: &str, max_entries: usize) -> CoordinatorResult<u64>;
}
