//! In-process ordered-set store.
//!
//! Wraps a `board_core::Scoreboard` and announces every upsert on a
//! broadcast channel so a notification-driven trigger can follow it.

use std::sync::Arc;

use async_trait::async_trait;
use board_core::{ScoreEntry, Scoreboard};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;

use crate::change::{Change, ChangeSource};
use crate::error::{ChangeError, StoreError};

use super::ScoreStore;

/// Pending change notifications per watcher before it is considered lagged.
const CHANGE_CAPACITY: usize = 256;

pub struct MemoryStore {
    board: RwLock<Scoreboard>,
    changes: broadcast::Sender<Arc<str>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        MemoryStore {
            board: RwLock::new(Scoreboard::new()),
            changes,
        }
    }

    /// Number of distinct names at `key`.
    pub async fn len(&self, key: &str) -> usize {
        self.board
            .read()
            .await
            .get_board(key)
            .map(|b| b.len())
            .unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn upsert(&self, key: &str, entry: &ScoreEntry) -> Result<(), StoreError> {
        {
            let mut board = self.board.write().await;
            board.upsert(key, entry);
        }

        // No watchers is fine.
        let _ = self.changes.send(Arc::from(key));
        Ok(())
    }

    async fn top(&self, key: &str, k: usize) -> Result<Vec<ScoreEntry>, StoreError> {
        Ok(self.board.read().await.top(key, k))
    }

    async fn watch(&self, key: &str, _k: usize) -> Result<Box<dyn ChangeSource>, StoreError> {
        Ok(Box::new(MemoryWatch {
            key: Arc::from(key),
            rx: self.changes.subscribe(),
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Notification-driven change source over a [`MemoryStore`].
struct MemoryWatch {
    key: Arc<str>,
    rx: broadcast::Receiver<Arc<str>>,
}

#[async_trait]
impl ChangeSource for MemoryWatch {
    async fn next_change(&mut self) -> Result<Change, ChangeError> {
        loop {
            match self.rx.recv().await {
                Ok(key) if key == self.key => return Ok(Change::Changed),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    // Several upserts collapse into one refresh.
                    tracing::debug!(skipped, key = %self.key, "change listener lagged");
                    return Ok(Change::Changed);
                }
                Err(RecvError::Closed) => return Err(StoreError::Closed.into()),
            }
        }
    }

    fn describe(&self) -> &'static str {
        "memory-watch"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn entry(name: &str, score: i64) -> ScoreEntry {
        ScoreEntry::new(name, score).unwrap()
    }

    #[tokio::test]
    async fn upsert_then_top() {
        let store = MemoryStore::new();
        store.upsert("lb", &entry("alice", 10)).await.unwrap();
        store.upsert("lb", &entry("bob", 20)).await.unwrap();
        store.upsert("lb", &entry("alice", 99)).await.unwrap();

        assert_eq!(
            store.top("lb", 6).await.unwrap(),
            vec![entry("alice", 99), entry("bob", 20)]
        );
        assert_eq!(store.len("lb").await, 2);
        assert!(store.top("other", 6).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn watch_fires_once_per_upsert_on_its_key() {
        let store = MemoryStore::new();
        let mut watch = store.watch("lb", 6).await.unwrap();

        store.upsert("elsewhere", &entry("x", 1)).await.unwrap();
        store.upsert("lb", &entry("a", 1)).await.unwrap();
        store.upsert("lb", &entry("b", 2)).await.unwrap();

        assert_eq!(watch.next_change().await.unwrap(), Change::Changed);
        assert_eq!(watch.next_change().await.unwrap(), Change::Changed);

        let pending = tokio::time::timeout(Duration::from_millis(50), watch.next_change()).await;
        assert!(pending.is_err(), "no further change expected");
    }

    #[tokio::test]
    async fn lagging_watch_coalesces() {
        let store = MemoryStore::new();
        let mut watch = store.watch("lb", 6).await.unwrap();

        for i in 0..(CHANGE_CAPACITY as i64 + 10) {
            store.upsert("lb", &entry("p", i)).await.unwrap();
        }

        assert_eq!(watch.next_change().await.unwrap(), Change::Changed);
    }
}
