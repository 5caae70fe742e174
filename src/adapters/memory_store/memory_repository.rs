//! In-memory `MemoryRepository` fallback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::MemoryEntry;
use crate::domain::ports::MemoryRepository;

type Key = (String, String);

#[derive(Default)]
pub struct InMemoryMemoryRepository {
    entries: RwLock<HashMap<Key, MemoryEntry>>,
}

impl InMemoryMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryRepository for InMemoryMemoryRepository {
    async fn put(&self, entry: &MemoryEntry) -> CoordinatorResult<()> {
        self.entries.write().insert(
            (entry.namespace.clone(), entry.key.clone()),
            entry.clone(),
        );
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> CoordinatorResult<Option<MemoryEntry>> {
        Ok(self
            .entries
            .read()
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    async fn record_access(&self, namespace: &str, key: &str) -> CoordinatorResult<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(&(namespace.to_string(), key.to_string()))
            .ok_or_else(|| CoordinatorError::UnknownEntity {
                kind: "memory_entry",
                id: format!("{namespace}/{key}"),
            })?;
        entry.record_access();
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> CoordinatorResult<()> {
        self.entries
            .write()
            .remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_namespace(&self, namespace: &str) -> CoordinatorResult<Vec<MemoryEntry>> {
        let mut out: Vec<MemoryEntry> = self
            .entries
            .read()
            .values()
            .filter(|e| e.namespace == namespace)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> CoordinatorResult<u64> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        Ok((before - entries.len()) as u64)
    }

    async fn evict_oversized(&self, namespace: &str, max_entries: usize) -> CoordinatorResult<u64> {
        let mut entries = self.entries.write();
        let mut in_namespace: Vec<Key> = entries
            .iter()
            .filter(|(_, e)| e.namespace == namespace)
            .map(|(k, _)| k.clone())
            .collect();

        if in_namespace.len() <= max_entries {
            return Ok(0);
        }

        in_namespace.sort_by_key(|k| {
            let e = &entries[k];
            e.last_access_at.unwrap_or(e.created_at)
        });

        let overflow = in_namespace.len() - max_entries;
        let mut removed = 0;
        for key in in_namespace.into_iter().take(overflow) {
            entries.remove(&key);
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RetentionPolicy;

    #[tokio::test]
    async fn put_and_get_round_trips() {
        let repo = InMemoryMemoryRepository::new();
        let entry = MemoryEntry::new("ns", "k", serde_json::json!(1), RetentionPolicy::Persistent);
        repo.put(&entry).await.unwrap();
        let fetched = repo.get("ns", "k").await.unwrap().unwrap();
        assert_eq!(fetched.value, serde_json::json!(1));
    }

    #[tokio::test]
    async fn evict_oversized_trims_to_cap() {
        let repo = InMemoryMemoryRepository::new();
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
        assert_eq!(repo.list_namespace("bounded").await.unwrap().len(), 3);
    }
}
