//! Memory domain model.
//!
//! Collective memory is a namespaced key/value store shared by every agent
//! in a swarm. Entries may carry a retention policy that bounds how long
//! (or how large) a namespace is allowed to grow before the Memory
//! component's background sweep reclaims space.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long an entry, or a namespace as a whole, is retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Never expires on its own; only explicit deletion removes it.
    Persistent,
    /// Expires `ttl_secs` seconds after the last write.
    TimeBased {
        /// Time-to-live, in seconds.
        ttl_secs: i64,
    },
    /// The namespace is capped at `max_entries`; oldest-accessed entries
    /// are evicted first once the cap is exceeded.
    SizeBased {
        /// Maximum number of live entries in the namespace.
        max_entries: usize,
    },
}

impl RetentionPolicy {
    /// Computes the expiry time for an entry written `at`, if this policy
    /// is time-based.
    #[must_use]
    pub fn expires_at(self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::TimeBased { ttl_secs } => Some(at + Duration::seconds(ttl_secs)),
            Self::Persistent | Self::SizeBased { .. } => None,
        }
    }
}

/// A single key/value entry in collective memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Logical grouping, e.g. `"swarm:<id>:findings"`.
    pub namespace: String,
    /// Key, unique within `namespace`.
    pub key: String,
    /// Opaque JSON-serialized payload.
    pub value: serde_json::Value,
    /// Retention policy applied to this entry.
    pub retention: RetentionPolicy,
    /// When the entry was first written.
    pub created_at: DateTime<Utc>,
    /// When the entry expires under its retention policy, if ever.
    pub expires_at: Option<DateTime<Utc>>,
    /// Number of reads since creation.
    pub access_count: u64,
    /// Timestamp of the most recent read, if any.
    pub last_access_at: Option<DateTime<Utc>>,
}

impl MemoryEntry {
    /// Creates a new entry with the given retention policy.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: serde_json::Value,
        retention: RetentionPolicy,
    ) -> Self {
        let now = Utc::now();
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value,
            retention,
            created_at: now,
            expires_at: retention.expires_at(now),
            access_count: 0,
            last_access_at: None,
        }
    }

    /// Whether the entry has expired as of `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| now >= expiry)
    }

    /// Records a read, bumping the access counter and refreshing
    /// `last_access_at`.
    pub fn record_access(&mut self) {
        self.access_count += 1;
        self.last_access_at = Some(Utc::now());
    }

    /// Re-derives `expires_at` from the current retention policy and the
    /// original write time, used after a TTL refresh on overwrite.
    pub fn refresh_expiry(&mut self) {
        let now = Utc::now();
        self.created_at = now;
        self.expires_at = self.retention.expires_at(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistent_entries_never_expire() {
        let entry = MemoryEntry::new("ns", "k", serde_json::json!(1), RetentionPolicy::Persistent);
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired_at(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn time_based_entries_expire_after_ttl() {
        let entry = MemoryEntry::new(
            "ns",
            "k",
            serde_json::json!(1),
            RetentionPolicy::TimeBased { ttl_secs: 60 },
        );
        assert!(!entry.is_expired_at(Utc::now()));
        assert!(entry.is_expired_at(Utc::now() + Duration::seconds(61)));
    }

    #[test]
    fn record_access_increments_counter() {
        let mut entry =
            MemoryEntry::new("ns", "k", serde_json::json!(1), RetentionPolicy::Persistent);
        entry.record_access();
        entry.record_access();
        assert_eq!(entry.access_count, 2);
        assert!(entry.last_access_at.is_some());
    }
}
