//! Deferred event store - score-ordered collections of pending payloads.
//!
//! The backing store is a sorted set addressed by name: members are opaque
//! strings, scores are Unix seconds at which the member becomes due.
//! [`EventQueue`] layers the game event encoding on top of it.

mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::events::GameEvent;

pub use memory::MemoryScoredSet;

/// One stored member and its score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredEntry {
    pub member: String,
    pub score: i64,
}

/// Sorted-set storage. Duplicate members are kept as distinct entries.
#[async_trait]
pub trait ScoredSet: Send + Sync {
    /// Insert `member` with `score`.
    async fn add(&self, key: &str, member: String, score: i64) -> Result<(), StoreError>;

    /// Entries with `min <= score <= max`, ascending by score (insertion order
    /// among equal scores), at most `limit` of them.
    async fn range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, StoreError>;

    /// Remove exactly one entry whose member equals `member`. Returns whether
    /// an entry was removed.
    async fn remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Number of entries under `key`.
    async fn count(&self, key: &str) -> Result<usize, StoreError>;
}

/// Typed view of the deferred event set.
#[derive(Clone)]
pub struct EventQueue {
    set: Arc<dyn ScoredSet>,
    key: String,
}

impl EventQueue {
    pub fn new(set: Arc<dyn ScoredSet>, key: impl Into<String>) -> Self {
        Self {
            set,
            key: key.into(),
        }
    }

    /// Serialize `event` and store it due at `due_at` (Unix seconds).
    pub async fn enqueue(&self, event: &GameEvent, due_at: i64) -> Result<(), StoreError> {
        let payload = event.encode()?;
        self.set.add(&self.key, payload, due_at).await
    }

    /// Raw entries due at or before `now`, oldest first. Nothing is removed.
    pub async fn fetch_due(&self, now: i64, limit: usize) -> Result<Vec<ScoredEntry>, StoreError> {
        self.set.range_by_score(&self.key, 0, now, limit).await
    }

    /// Delete one entry previously returned by [`fetch_due`](Self::fetch_due).
    pub async fn remove(&self, entry: &ScoredEntry) -> Result<bool, StoreError> {
        self.set.remove(&self.key, &entry.member).await
    }

    pub async fn pending(&self) -> Result<usize, StoreError> {
        self.set.count(&self.key).await
    }
}
