//! In-process sorted set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{ScoredEntry, ScoredSet};
use crate::error::StoreError;

/// Sorted sets held in memory. Each set is kept ordered by score, ties in
/// insertion order.
#[derive(Debug, Default)]
pub struct MemoryScoredSet {
    sets: Mutex<HashMap<String, Vec<ScoredEntry>>>,
    offline: AtomicBool,
}

impl MemoryScoredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store going away (every call fails) or coming back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn sets(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<ScoredEntry>>>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("sorted set store is offline".into()));
        }
        self.sets
            .lock()
            .map_err(|_| StoreError::Unavailable("sorted set lock poisoned".into()))
    }
}

#[async_trait]
impl ScoredSet for MemoryScoredSet {
    async fn add(&self, key: &str, member: String, score: i64) -> Result<(), StoreError> {
        let mut sets = self.sets()?;
        let entries = sets.entry(key.to_string()).or_default();
        let at = entries.partition_point(|e| e.score <= score);
        entries.insert(at, ScoredEntry { member, score });
        Ok(())
    }

    async fn range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, StoreError> {
        let sets = self.sets()?;
        let Some(entries) = sets.get(key) else {
            return Ok(Vec::new());
        };
        Ok(entries
            .iter()
            .skip_while(|e| e.score < min)
            .take_while(|e| e.score <= max)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut sets = self.sets()?;
        let Some(entries) = sets.get_mut(key) else {
            return Ok(false);
        };
        match entries.iter().position(|e| e.member == member) {
            Some(index) => {
                entries.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.sets()?.get(key).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn equal_scores_keep_insertion_order() {
        let set = MemoryScoredSet::new();
        set.add("k", "a".into(), 5).await.unwrap();
        set.add("k", "b".into(), 5).await.unwrap();
        set.add("k", "c".into(), 1).await.unwrap();

        let members: Vec<String> = set
            .range_by_score("k", 0, 10, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.member)
            .collect();
        assert_eq!(members, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn negative_scores_are_outside_due_range() {
        let set = MemoryScoredSet::new();
        set.add("k", "early".into(), -5).await.unwrap();
        set.add("k", "ok".into(), 3).await.unwrap();
        let due = set.range_by_score("k", 0, 10, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].member, "ok");
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let set = MemoryScoredSet::new();
        set.set_offline(true);
        let err = set.add("k", "x".into(), 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        set.set_offline(false);
        assert!(set.add("k", "x".into(), 1).await.is_ok());
    }

    #[tokio::test]
    async fn remove_missing_member_is_noop() {
        let set = MemoryScoredSet::new();
        assert!(!set.remove("k", "nothing").await.unwrap());
        set.add("k", "x".into(), 1).await.unwrap();
        assert!(!set.remove("k", "y").await.unwrap());
        assert_eq!(set.count("k").await.unwrap(), 1);
    }
}
