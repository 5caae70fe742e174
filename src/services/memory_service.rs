//! Collective memory: a namespaced key/value store shared by every agent
//! in a swarm, fronted by a bounded LRU cache over the durable repository
//! (§4.2).

use std::collections::HashSet;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::instrument;

use crate::domain::errors::{CoordinatorError, CoordinatorResult};
use crate::domain::models::{MemoryEntry, RetentionPolicy};
use crate::domain::ports::MemoryRepository;

/// Namespaces declared at startup (§4.2). `default` auto-creates on first
/// use; every other namespace must be declared before it accepts writes.
pub const BUILTIN_NAMESPACES: &[&str] = &[
    "default",
    "task-results",
    "agent-state",
    "learning-data",
    "performance-metrics",
    "decisions",
];

/// Entries older than this, larger than this, and accessed fewer than
/// `COMPRESS_MIN_ACCESS` times are eligible for `compress` (§4.2).
const COMPRESS_MIN_AGE_DAYS: i64 = 7;
const COMPRESS_MIN_SIZE_BYTES: usize = 10_000;
const COMPRESS_MAX_ACCESS_COUNT: u64 = 5;

/// Sort order for `search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    /// Most-accessed first.
    Access,
    /// Most-recently-accessed first.
    Recent,
    /// Most-recently-created first.
    Created,
}

/// Search options (§4.2).
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Restrict to one namespace.
    pub namespace: Option<String>,
    /// Unanchored, case-insensitive substring match over key and value.
    pub pattern: Option<String>,
    /// Restrict to keys starting with this prefix.
    pub key_prefix: Option<String>,
    /// Restrict to entries accessed at least this many times.
    pub min_access_count: Option<u64>,
    /// Maximum entries returned.
    pub limit: usize,
    /// Sort order, if any.
    pub sort_by: Option<SortBy>,
}

/// Aggregate counters for `stats()`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    /// Total entries across every namespace.
    pub total_entries: u64,
    /// Entries currently resident in the LRU cache.
    pub cached_entries: usize,
    /// Namespaces with at least one entry.
    pub namespace_count: usize,
}

/// A namespace's retention policy, fixed at declaration time.
struct NamespaceDef {
    retention: RetentionPolicy,
}

struct Cache {
    lru: LruCache<(String, String), MemoryEntry>,
}

/// Collective memory service: LRU cache in front of a durable
/// `MemoryRepository` (§4.2).
pub struct MemoryService {
    repo: Arc<dyn MemoryRepository>,
    cache: Mutex<Cache>,
    namespaces: Mutex<std::collections::HashMap<String, NamespaceDef>>,
}

impl MemoryService {
    /// Builds a service over `repo` with the builtin namespace set
    /// pre-declared as `Persistent`.
    #[must_use]
    pub fn new(repo: Arc<dyn MemoryRepository>, cache_capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(cache_capacity.max(1)).unwrap();
        let mut namespaces = std::collections::HashMap::new();
        for ns in BUILTIN_NAMESPACES {
            namespaces.insert(
                (*ns).to_string(),
                NamespaceDef {
                    retention: RetentionPolicy::Persistent,
                },
            );
        }
        Self {
            repo,
            cache: Mutex::new(Cache {
                lru: LruCache::new(capacity),
            }),
            namespaces: Mutex::new(namespaces),
        }
    }

    /// Declares a namespace with a fixed retention policy, or replaces an
    /// existing declaration.
    pub fn declare_namespace(&self, namespace: impl Into<String>, retention: RetentionPolicy) {
        self.namespaces
            .lock()
            .insert(namespace.into(), NamespaceDef { retention });
    }

    fn ensure_declared(&self, namespace: &str) -> CoordinatorResult<()> {
        let mut namespaces = self.namespaces.lock();
        if namespaces.contains_key(namespace) {
            return Ok(());
        }
        if namespace == "default" {
            namespaces.insert(
                "default".to_string(),
                NamespaceDef {
                    retention: RetentionPolicy::Persistent,
                },
            );
            return Ok(());
        }
        Err(CoordinatorError::NamespaceUnknown(namespace.to_string()))
    }

    /// Idempotent upsert. Writes through to the repository and updates
    /// the cache.
    #[instrument(skip(self, value), fields(namespace, key))]
    pub async fn store(
        &self,
        namespace: &str,
        key: &str,
        value: serde_json::Value,
    ) -> CoordinatorResult<()> {
        self.ensure_declared(namespace)?;
        let retention = self
            .namespaces
            .lock()
            .get(namespace)
            .map(|def| def.retention)
            .unwrap_or(RetentionPolicy::Persistent);

        if let RetentionPolicy::SizeBased { max_entries } = retention {
            let current = self.repo.list_namespace(namespace).await?.len();
            if current >= max_entries
                && self
                    .repo
                    .get(namespace, key)
                    .await?
                    .is_none()
            {
                return Err(CoordinatorError::CapacityExceeded(namespace.to_string()));
            }
        }

        let entry = MemoryEntry::new(namespace, key, value, retention);
        self.repo.put(&entry).await?;
        self.cache
            .lock()
            .lru
            .put((namespace.to_string(), key.to_string()), entry);
        Ok(())
    }

    /// Returns the cached value if present and unexpired; otherwise reads
    /// through to the repository. A miss returns `None`, not an error.
    #[instrument(skip(self), fields(namespace, key))]
    pub async fn retrieve(&self, namespace: &str, key: &str) -> CoordinatorResult<Option<serde_json::Value>> {
        let cache_key = (namespace.to_string(), key.to_string());
        if let Some(entry) = self.cache.lock().lru.get(&cache_key) {
            if !entry.is_expired_at(chrono::Utc::now()) {
                let value = entry.value.clone();
                self.repo.record_access(namespace, key).await.ok();
                return Ok(Some(value));
            }
        }

        let Some(entry) = self.repo.get(namespace, key).await? else {
            return Ok(None);
        };
        if entry.is_expired_at(chrono::Utc::now()) {
            self.repo.delete(namespace, key).await?;
            return Ok(None);
        }
        self.repo.record_access(namespace, key).await?;
        let value = entry.value.clone();
        self.cache.lock().lru.put(cache_key, entry);
        Ok(Some(value))
    }

    /// Deletes an entry from both cache and repository.
    pub async fn delete(&self, namespace: &str, key: &str) -> CoordinatorResult<()> {
        self.cache
            .lock()
            .lru
            .pop(&(namespace.to_string(), key.to_string()));
        self.repo.delete(namespace, key).await
    }

    /// Lists up to `limit` entries in a namespace.
    pub async fn list(&self, namespace: &str, limit: usize) -> CoordinatorResult<Vec<MemoryEntry>> {
        let mut entries = self.repo.list_namespace(namespace).await?;
        entries.truncate(limit);
        Ok(entries)
    }

    /// Searches across one or all namespaces (§4.2).
    pub async fn search(&self, opts: &SearchOptions) -> CoordinatorResult<Vec<MemoryEntry>> {
        let namespaces: Vec<String> = match &opts.namespace {
            Some(ns) => vec![ns.clone()],
            None => self.namespaces.lock().keys().cloned().collect(),
        };

        let mut matches = Vec::new();
        for ns in namespaces {
            for entry in self.repo.list_namespace(&ns).await? {
                if let Some(prefix) = &opts.key_prefix {
                    if !entry.key.starts_with(prefix.as_str()) {
                        continue;
                    }
                }
                if let Some(min) = opts.min_access_count {
                    if entry.access_count < min {
                        continue;
                    }
                }
                if let Some(pattern) = &opts.pattern {
                    let pattern = pattern.to_lowercase();
                    let haystack = format!("{} {}", entry.key, entry.value).to_lowercase();
                    if !haystack.contains(&pattern) {
                        continue;
                    }
                }
                matches.push(entry);
            }
        }

        match opts.sort_by {
            Some(SortBy::Access) => matches.sort_by(|a, b| b.access_count.cmp(&a.access_count)),
            Some(SortBy::Recent) => matches.sort_by(|a, b| b.last_access_at.cmp(&a.last_access_at)),
            Some(SortBy::Created) => matches.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            None => {}
        }
        matches.truncate(opts.limit);
        Ok(matches)
    }

    /// Aggregate counters across every declared namespace.
    pub async fn stats(&self) -> CoordinatorResult<MemoryStats> {
        let namespaces: Vec<String> = self.namespaces.lock().keys().cloned().collect();
        let mut total = 0u64;
        let mut populated = 0usize;
        for ns in &namespaces {
            let count = self.repo.list_namespace(ns).await?.len();
            if count > 0 {
                populated += 1;
            }
            total += count as u64;
        }
        Ok(MemoryStats {
            total_entries: total,
            cached_entries: self.cache.lock().lru.len(),
            namespace_count: populated,
        })
    }

    /// Deletes every expired entry in the store. Run on an interval by
    /// the background sweep loop (default 60s, §4.2).
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self) -> CoordinatorResult<u64> {
        let removed = self.repo.delete_expired(chrono::Utc::now()).await?;
        if removed > 0 {
            tracing::debug!(removed, "expired-entry sweep reclaimed entries");
        }
        Ok(removed)
    }

    /// Enforces each `SizeBased` namespace's cap by evicting
    /// least-recently-accessed entries. Run on an interval (default
    /// 3600s, §4.2).
    #[instrument(skip(self))]
    pub async fn enforce_retention(&self) -> CoordinatorResult<u64> {
        let mut total_evicted = 0u64;
        let declarations: Vec<(String, RetentionPolicy)> = self
            .namespaces
            .lock()
            .iter()
            .map(|(ns, def)| (ns.clone(), def.retention))
            .collect();

        for (ns, retention) in declarations {
            if let RetentionPolicy::SizeBased { max_entries } = retention {
                total_evicted += self.repo.evict_oversized(&ns, max_entries).await?;
            }
        }
        Ok(total_evicted)
    }

    /// Replaces eligible entries' values with a tagged, lossless
    /// compressed representation (§4.2): `age > 7d ∧ size > 10000B ∧
    /// access_count < 5`. Restricts to `namespace` if given.
    #[instrument(skip(self))]
    pub async fn compress(&self, namespace: Option<&str>) -> CoordinatorResult<u64> {
        let namespaces: Vec<String> = match namespace {
            Some(ns) => vec![ns.to_string()],
            None => self.namespaces.lock().keys().cloned().collect(),
        };

        let cutoff = chrono::Utc::now() - chrono::Duration::days(COMPRESS_MIN_AGE_DAYS);
        let mut compressed_count = 0u64;
        for ns in namespaces {
            for mut entry in self.repo.list_namespace(&ns).await? {
                if entry.created_at > cutoff || entry.access_count >= COMPRESS_MAX_ACCESS_COUNT {
                    continue;
                }
                let serialized = entry.value.to_string();
                if serialized.len() <= COMPRESS_MIN_SIZE_BYTES {
                    continue;
                }
                if entry
                    .value
                    .get("compressed")
                    .and_then(serde_json::Value::as_bool)
                    == Some(true)
                {
                    continue;
                }
                let original_length = serialized.len();
                let packed = lz_pack(&serialized);
                entry.value = serde_json::json!({
                    "compressed": true,
                    "original_length": original_length,
                    "data": packed,
                });
                self.repo.put(&entry).await?;
                compressed_count += 1;
            }
        }
        if compressed_count > 0 {
            tracing::debug!(compressed_count, "compression sweep packed entries");
        }
        Ok(compressed_count)
    }

    /// Serializes every entry across every namespace for `backup`.
    pub async fn backup(&self) -> CoordinatorResult<Vec<MemoryEntry>> {
        let namespaces: Vec<String> = self.namespaces.lock().keys().cloned().collect();
        let mut all = Vec::new();
        for ns in namespaces {
            all.extend(self.repo.list_namespace(&ns).await?);
        }
        Ok(all)
    }

    /// Restores entries produced by `backup`, declaring any namespace
    /// they reference that isn't already known.
    pub async fn restore(&self, entries: Vec<MemoryEntry>) -> CoordinatorResult<u64> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut restored = 0u64;
        for entry in entries {
            if seen.insert(entry.namespace.clone()) {
                self.declare_namespace(entry.namespace.clone(), entry.retention);
            }
            self.repo.put(&entry).await?;
            restored += 1;
        }
        Ok(restored)
    }
}

/// Minimal lossless packing used by `compress`: run-length encoding,
/// tagged so `restore` logic (or a human inspecting a backup) can detect
/// it. Not intended to compete with a general-purpose compressor; the
/// contract only requires round-tripping.
fn lz_pack(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        let mut run = 1usize;
        while chars.peek() == Some(&c) && run < 9 {
            chars.next();
            run += 1;
        }
        if run > 1 {
            out.push_str(&run.to_string());
            out.push(c);
        } else {
            out.push('1');
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryMemoryRepository;

    fn service() -> MemoryService {
        MemoryService::new(Arc::new(InMemoryMemoryRepository::new()), 100)
    }

    #[tokio::test]
    async fn store_and_retrieve_round_trips_through_cache() {
        let svc = service();
        svc.store("default", "k", serde_json::json!({"v": 1})).await.unwrap();
        let value = svc.retrieve("default", "k").await.unwrap().unwrap();
        assert_eq!(value, serde_json::json!({"v": 1}));
    }

    #[tokio::test]
    async fn store_against_an_undeclared_namespace_is_rejected() {
        let svc = service();
        let err = svc
            .store("nonexistent", "k", serde_json::json!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::NamespaceUnknown(_)));
    }

    #[tokio::test]
    async fn retrieve_miss_returns_none_without_error() {
        let svc = service();
        assert!(svc.retrieve("default", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn size_based_namespace_rejects_writes_past_capacity() {
        let svc = service();
        svc.declare_namespace("bounded", RetentionPolicy::SizeBased { max_entries: 1 });
        svc.store("bounded", "a", serde_json::json!(1)).await.unwrap();
        let err = svc.store("bounded", "b", serde_json::json!(2)).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::CapacityExceeded(_)));
    }

    #[tokio::test]
    async fn compress_packs_large_stale_entries() {
        let svc = service();
        svc.store("default", "big", serde_json::json!("x".repeat(20_000)))
            .await
            .unwrap();
        // Backdate manually via restore to simulate age, since `store`
        // always timestamps `now`.
        let mut entries = svc.backup().await.unwrap();
        for e in &mut entries {
            e.created_at = chrono::Utc::now() - chrono::Duration::days(10);
        }
        svc.restore(entries).await.unwrap();

        let compressed = svc.compress(Some("default")).await.unwrap();
        assert_eq!(compressed, 1);
    }

    #[tokio::test]
    async fn search_matches_pattern_case_insensitively() {
        let svc = service();
        svc.store("default", "alpha", serde_json::json!("Hello World")).await.unwrap();
        svc.store("default", "beta", serde_json::json!("goodbye")).await.unwrap();

        let results = svc
            .search(&SearchOptions {
                pattern: Some("hello".into()),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "alpha");
    }
}
