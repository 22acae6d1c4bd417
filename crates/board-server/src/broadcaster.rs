//! Fan-out of ranking snapshots.
//!
//! One round: encode the snapshot once, then queue it for every active
//! subscriber without waiting. A subscriber whose queue is closed or
//! still full from earlier rounds is removed; nobody else waits on it.
//! The socket write itself is bounded by the session's `send_timeout`.
//!
//! The broadcast loop ties a [`ChangeSource`] to the producer:
//! - `Changed`        => query the store, broadcast the result.
//! - `Ranked(..)`     => stamp the pushed ranking, broadcast it.
//! - store failure    => log, wait `retry_delay`, try again.
//! - malformed change => log, skip the cycle.

use std::sync::Arc;
use std::time::Duration;

use board_core::RankingSnapshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::change::{Change, ChangeSource};
use crate::error::ChangeError;
use crate::producer::SnapshotProducer;
use crate::registry::SubscriberRegistry;
use crate::types::SnapshotFrame;

/// Outcome of one broadcast round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Broadcaster { registry }
    }

    pub async fn broadcast(&self, snapshot: &RankingSnapshot) -> BroadcastReport {
        match SnapshotFrame::encode(snapshot) {
            Ok(frame) => self.broadcast_frame(frame).await,
            Err(e) => {
                error!(version = snapshot.version, error = %e, "failed to encode snapshot");
                BroadcastReport::default()
            }
        }
    }

    pub async fn broadcast_frame(&self, frame: SnapshotFrame) -> BroadcastReport {
        let handles = self.registry.list_active().await;
        if handles.is_empty() {
            return BroadcastReport::default();
        }

        let failed: Vec<_> = handles
            .iter()
            .filter_map(|handle| handle.deliver(frame.clone()).err().map(|e| (handle.id, e)))
            .collect();

        let mut report = BroadcastReport {
            delivered: handles.len() - failed.len(),
            dropped: 0,
        };
        for (id, e) in failed {
            warn!(subscriber = %id, error = %e, "delivery failed, dropping subscriber");
            if self.registry.unregister(id).await {
                report.dropped += 1;
            }
        }

        debug!(
            version = frame.version,
            delivered = report.delivered,
            dropped = report.dropped,
            "broadcast round complete"
        );
        report
    }
}

/// Drive `source` until `cancel` fires.
pub async fn run_broadcast_loop(
    mut source: Box<dyn ChangeSource>,
    producer: Arc<SnapshotProducer>,
    broadcaster: Broadcaster,
    retry_delay: Duration,
    cancel: CancellationToken,
) {
    info!(source = source.describe(), "broadcast loop started");

    loop {
        let change = tokio::select! {
            _ = cancel.cancelled() => break,
            change = source.next_change() => change,
        };

        let snapshot = match change {
            Ok(Change::Changed) => producer.produce().await.map_err(ChangeError::from),
            Ok(Change::Ranked(entries)) => Ok(producer.stamp(entries)),
            Err(e) => Err(e),
        };

        match snapshot {
            Ok(snapshot) => {
                broadcaster.broadcast(&snapshot).await;
            }
            Err(ChangeError::Protocol(e)) => {
                warn!(error = %e, "skipping malformed change notification");
            }
            Err(ChangeError::Store(e)) => {
                warn!(error = %e, retry_ms = retry_delay.as_millis() as u64, "store unavailable");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(retry_delay) => {}
                }
            }
        }
    }

    info!("broadcast loop shutting down");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use board_core::ScoreEntry;
    use board_protocol::ProtocolError;
    use tokio::sync::mpsc;

    use super::*;
    use crate::error::StoreError;
    use crate::store::{MemoryStore, ScoreStore};

    fn entry(name: &str, score: i64) -> ScoreEntry {
        ScoreEntry::new(name, score).unwrap()
    }

    fn snapshot(version: u64) -> RankingSnapshot {
        RankingSnapshot {
            version,
            entries: vec![entry("a", 1)],
        }
    }

    #[tokio::test]
    async fn every_subscriber_gets_the_same_payload() {
        let registry = Arc::new(SubscriberRegistry::new(4, 0));
        let mut receivers = Vec::new();
        for _ in 0..7 {
            receivers.push(registry.register().await.unwrap().1);
        }

        let broadcaster = Broadcaster::new(registry);
        let report = broadcaster.broadcast(&snapshot(1)).await;
        assert_eq!(report, BroadcastReport { delivered: 7, dropped: 0 });

        let first = receivers[0].recv().await.unwrap();
        for rx in &mut receivers[1..] {
            assert_eq!(rx.recv().await.unwrap(), first);
        }
        assert_eq!(&*first.json, r#"[{"name":"a","score":1}]"#);
    }

    #[tokio::test]
    async fn stuck_subscriber_is_dropped_without_blocking_others() {
        let registry = Arc::new(SubscriberRegistry::new(1, 0));
        let (stuck, _stuck_rx) = registry.register().await.unwrap();
        let (live, mut live_rx) = registry.register().await.unwrap();
        let (gone, gone_rx) = registry.register().await.unwrap();
        drop(gone_rx);

        let broadcaster = Broadcaster::new(registry.clone());

        // Fill the stuck subscriber's queue; the live one drains.
        broadcaster.broadcast(&snapshot(1)).await;
        assert_eq!(live_rx.recv().await.unwrap().version, 1);
        assert!(!registry.is_registered(gone).await);

        let report = broadcaster.broadcast(&snapshot(2)).await;
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(live_rx.recv().await.unwrap().version, 2);
        assert!(!registry.is_registered(stuck).await);
        assert!(registry.is_registered(live).await);

        // Removed subscribers are not attempted again.
        let report = broadcaster.broadcast(&snapshot(3)).await;
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 0 });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn rounds_race_register_and_unregister() {
        let registry = Arc::new(SubscriberRegistry::new(64, 0));
        let mut steady = Vec::new();
        for _ in 0..8 {
            steady.push(registry.register().await.unwrap());
        }

        // Churn: subscribers come and go while rounds are in flight.
        let churn: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    for _ in 0..50 {
                        let (id, rx) = registry.register().await.unwrap();
                        tokio::task::yield_now().await;
                        drop(rx);
                        registry.unregister(id).await;
                    }
                })
            })
            .collect();

        let broadcaster = Broadcaster::new(registry.clone());
        for version in 1..=32 {
            let report = broadcaster.broadcast(&snapshot(version)).await;
            assert!(report.delivered >= steady.len());
        }
        for task in churn {
            task.await.unwrap();
        }

        // Every steady subscriber saw every round, in order.
        for (id, rx) in &mut steady {
            for version in 1..=32 {
                assert_eq!(rx.recv().await.unwrap().version, version);
            }
            assert!(registry.is_registered(*id).await);
        }
        assert_eq!(registry.len().await, steady.len());
    }

    /// Scripted change source: yields queued results, then pends forever.
    struct Scripted {
        changes: mpsc::UnboundedReceiver<Result<Change, ChangeError>>,
    }

    #[async_trait]
    impl ChangeSource for Scripted {
        async fn next_change(&mut self) -> Result<Change, ChangeError> {
            match self.changes.recv().await {
                Some(change) => change,
                None => std::future::pending().await,
            }
        }

        fn describe(&self) -> &'static str {
            "scripted"
        }
    }

    struct CountingStore {
        inner: MemoryStore,
        queries: AtomicUsize,
    }

    #[async_trait]
    impl ScoreStore for CountingStore {
        async fn upsert(&self, key: &str, entry: &ScoreEntry) -> Result<(), StoreError> {
            self.inner.upsert(key, entry).await
        }

        async fn top(&self, key: &str, k: usize) -> Result<Vec<ScoreEntry>, StoreError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.top(key, k).await
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn loop_survives_bad_cycles_and_stops_on_cancel() {
        let store = Arc::new(CountingStore {
            inner: MemoryStore::new(),
            queries: AtomicUsize::new(0),
        });
        store.upsert("lb", &entry("alice", 10)).await.unwrap();

        let producer = Arc::new(SnapshotProducer::new(store.clone(), "lb", 6));
        let registry = Arc::new(SubscriberRegistry::new(8, 0));
        let (_, mut rx) = registry.register().await.unwrap();

        let (tx, changes) = mpsc::unbounded_channel();
        tx.send(Err(ChangeError::Protocol(ProtocolError::OddLength(3)))).unwrap();
        tx.send(Err(ChangeError::Store(StoreError::Closed))).unwrap();
        tx.send(Ok(Change::Changed)).unwrap();
        tx.send(Ok(Change::Ranked(vec![entry("pushed", 7)]))).unwrap();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_broadcast_loop(
            Box::new(Scripted { changes }),
            producer.clone(),
            Broadcaster::new(registry.clone()),
            Duration::from_millis(10),
            cancel.clone(),
        ));

        let queried = rx.recv().await.unwrap();
        assert_eq!(&*queried.json, r#"[{"name":"alice","score":10}]"#);
        let pushed = rx.recv().await.unwrap();
        assert_eq!(&*pushed.json, r#"[{"name":"pushed","score":7}]"#);
        assert!(pushed.version > queried.version);
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);

        cancel.cancel();
        task.await.unwrap();
    }
}
