//! Ranking snapshot producer.
//!
//! Turns store state into versioned [`RankingSnapshot`]s. The version is
//! taken before the store is queried, so a snapshot built from an older
//! read always carries a smaller version than one built from a newer read.
//! The last published snapshot is kept and survives failed queries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use board_core::{RankingSnapshot, ScoreEntry};
use tokio::sync::watch;
use tracing::debug;

use crate::error::StoreError;
use crate::store::ScoreStore;

pub struct SnapshotProducer {
    store: Arc<dyn ScoreStore>,
    key: String,
    top_k: usize,
    next_version: AtomicU64,
    latest: watch::Sender<Option<Arc<RankingSnapshot>>>,
}

impl SnapshotProducer {
    pub fn new(store: Arc<dyn ScoreStore>, key: impl Into<String>, top_k: usize) -> Self {
        let (latest, _) = watch::channel(None);
        SnapshotProducer {
            store,
            key: key.into(),
            top_k,
            next_version: AtomicU64::new(1),
            latest,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Query the store for the current top-K.
    pub async fn produce(&self) -> Result<Arc<RankingSnapshot>, StoreError> {
        let version = self.take_version();
        let entries = self.store.top(&self.key, self.top_k).await?;
        Ok(self.publish(RankingSnapshot::from_unsorted(version, entries, self.top_k)))
    }

    /// Build a snapshot from a ranking the store pushed to us.
    pub fn stamp(&self, entries: Vec<ScoreEntry>) -> Arc<RankingSnapshot> {
        let version = self.take_version();
        self.publish(RankingSnapshot::from_unsorted(version, entries, self.top_k))
    }

    /// Most recent snapshot, if any query has succeeded yet.
    pub fn latest(&self) -> Option<Arc<RankingSnapshot>> {
        self.latest.borrow().clone()
    }

    /// Version of [`latest`](Self::latest).
    pub fn latest_version(&self) -> Option<u64> {
        self.latest.borrow().as_ref().map(|s| s.version)
    }

    /// Highest version handed out so far; 0 before the first.
    pub fn issued_version(&self) -> u64 {
        self.next_version.load(Ordering::SeqCst) - 1
    }

    fn take_version(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::SeqCst)
    }

    fn publish(&self, snapshot: RankingSnapshot) -> Arc<RankingSnapshot> {
        let snapshot = Arc::new(snapshot);
        let replaced = self.latest.send_if_modified(|current| match current {
            Some(existing) if existing.version >= snapshot.version => false,
            _ => {
                *current = Some(snapshot.clone());
                true
            }
        });
        if !replaced {
            debug!(version = snapshot.version, "newer snapshot already published");
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use async_trait::async_trait;

    use super::*;
    use crate::store::MemoryStore;

    fn entry(name: &str, score: i64) -> ScoreEntry {
        ScoreEntry::new(name, score).unwrap()
    }

    #[tokio::test]
    async fn versions_increase_and_latest_follows() {
        let store = Arc::new(MemoryStore::new());
        store.upsert("lb", &entry("alice", 10)).await.unwrap();
        let producer = SnapshotProducer::new(store.clone(), "lb", 6);

        assert!(producer.latest().is_none());

        let first = producer.produce().await.unwrap();
        store.upsert("lb", &entry("bob", 20)).await.unwrap();
        let second = producer.produce().await.unwrap();

        assert!(second.version > first.version);
        assert_eq!(second.entries, vec![entry("bob", 20), entry("alice", 10)]);
        assert_eq!(producer.latest_version(), Some(second.version));
    }

    #[tokio::test]
    async fn partial_board_is_not_padded() {
        let store = Arc::new(MemoryStore::new());
        store.upsert("lb", &entry("solo", 3)).await.unwrap();
        let producer = SnapshotProducer::new(store, "lb", 6);

        assert_eq!(producer.produce().await.unwrap().entries, vec![entry("solo", 3)]);
    }

    #[tokio::test]
    async fn stamped_rankings_are_sorted_and_truncated() {
        let producer = SnapshotProducer::new(Arc::new(MemoryStore::new()), "lb", 2);
        let snap = producer.stamp(vec![entry("b", 5), entry("a", 5), entry("c", 9)]);

        assert_eq!(snap.entries, vec![entry("c", 9), entry("a", 5)]);
    }

    struct FlakyStore {
        fail: AtomicBool,
    }

    #[async_trait]
    impl ScoreStore for FlakyStore {
        async fn upsert(&self, _key: &str, _entry: &ScoreEntry) -> Result<(), StoreError> {
            Ok(())
        }

        async fn top(&self, _key: &str, _k: usize) -> Result<Vec<ScoreEntry>, StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(StoreError::Closed)
            } else {
                Ok(vec![entry("kept", 1)])
            }
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn failed_query_keeps_previous_snapshot() {
        let store = Arc::new(FlakyStore {
            fail: AtomicBool::new(false),
        });
        let producer = SnapshotProducer::new(store.clone(), "lb", 6);

        let good = producer.produce().await.unwrap();
        store.fail.store(true, Ordering::SeqCst);

        assert!(matches!(producer.produce().await, Err(StoreError::Closed)));
        assert_eq!(producer.latest(), Some(good));
    }

    #[tokio::test]
    async fn issued_version_counts_failed_queries() {
        let store = Arc::new(FlakyStore {
            fail: AtomicBool::new(true),
        });
        let producer = SnapshotProducer::new(store, "lb", 6);
        assert_eq!(producer.issued_version(), 0);

        assert!(producer.produce().await.is_err());
        assert_eq!(producer.issued_version(), 1);
        assert_eq!(producer.latest_version(), None);
    }

    #[tokio::test]
    async fn older_snapshot_never_replaces_newer() {
        let producer = SnapshotProducer::new(Arc::new(MemoryStore::new()), "lb", 6);

        let older = producer.take_version();
        let newer = producer.stamp(vec![entry("new", 2)]);
        producer.publish(RankingSnapshot::from_unsorted(older, vec![entry("old", 1)], 6));

        assert_eq!(producer.latest_version(), Some(newer.version));
    }
}
