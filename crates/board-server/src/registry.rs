//! Subscriber registry.
//!
//! Maps each connected push client to the sending half of its bounded
//! outbound queue. The lock is only held to insert, remove or copy
//! handles; delivery happens on copies, so removal during a broadcast
//! round never disturbs the round in progress.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{DeliveryError, RegistryError};
use crate::types::{OutboundRx, OutboundTx, SnapshotFrame, SubscriberId};

/// A cheap, cloneable handle to one subscriber's queue.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    pub id: SubscriberId,
    tx: OutboundTx,
}

impl SubscriberHandle {
    /// Queue `frame` without waiting. A full queue means the writer is
    /// already `capacity` frames behind.
    pub fn deliver(&self, frame: SnapshotFrame) -> Result<(), DeliveryError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Lagging(self.id),
            TrySendError::Closed(_) => DeliveryError::Closed(self.id),
        })
    }
}

#[derive(Default)]
struct Inner {
    subscribers: HashMap<SubscriberId, SubscriberHandle>,
    closed: bool,
}

pub struct SubscriberRegistry {
    inner: RwLock<Inner>,
    next_id: AtomicU64,
    capacity: usize,
    max_subscribers: usize,
}

impl SubscriberRegistry {
    /// `capacity` bounds each subscriber's queue; `max_subscribers == 0`
    /// means no limit.
    pub fn new(capacity: usize, max_subscribers: usize) -> Self {
        SubscriberRegistry {
            inner: RwLock::new(Inner::default()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            max_subscribers,
        }
    }

    pub async fn register(&self) -> Result<(SubscriberId, OutboundRx), RegistryError> {
        let mut inner = self.inner.write().await;
        if inner.closed {
            return Err(RegistryError::Closed);
        }
        if self.max_subscribers > 0 && inner.subscribers.len() >= self.max_subscribers {
            return Err(RegistryError::Full {
                max: self.max_subscribers,
            });
        }

        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.capacity);
        inner.subscribers.insert(id, SubscriberHandle { id, tx });

        info!(subscriber = %id, active = inner.subscribers.len(), "subscriber registered");
        Ok((id, rx))
    }

    /// Remove `id`. Returns `false` if it was already gone.
    pub async fn unregister(&self, id: SubscriberId) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner.subscribers.remove(&id).is_some();
        if removed {
            info!(subscriber = %id, active = inner.subscribers.len(), "subscriber removed");
        }
        removed
    }

    /// Copy of every active handle, ordered by id.
    pub async fn list_active(&self) -> Vec<SubscriberHandle> {
        let inner = self.inner.read().await;
        let mut handles: Vec<_> = inner.subscribers.values().cloned().collect();
        handles.sort_by_key(|h| h.id);
        handles
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.subscribers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_registered(&self, id: SubscriberId) -> bool {
        self.inner.read().await.subscribers.contains_key(&id)
    }

    /// Drop every handle and refuse further registrations.
    ///
    /// Each session's queue closes once in-flight copies are dropped,
    /// which ends its writer.
    pub async fn close_all(&self) -> usize {
        let mut inner = self.inner.write().await;
        inner.closed = true;
        let dropped = inner.subscribers.len();
        inner.subscribers.clear();
        debug!(dropped, "registry closed");
        dropped
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn frame(version: u64) -> SnapshotFrame {
        SnapshotFrame {
            version,
            json: Arc::from("[]"),
        }
    }

    #[tokio::test]
    async fn register_list_unregister() {
        let registry = SubscriberRegistry::new(4, 0);
        let (a, _rx_a) = registry.register().await.unwrap();
        let (b, _rx_b) = registry.register().await.unwrap();

        assert_ne!(a, b);
        let ids: Vec<_> = registry.list_active().await.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![a, b]);

        assert!(registry.unregister(a).await);
        assert!(!registry.unregister(a).await);
        assert_eq!(registry.len().await, 1);
        assert!(!registry.is_registered(a).await);
        assert!(registry.is_registered(b).await);
    }

    #[tokio::test]
    async fn limit_rejects_extra_subscribers() {
        let registry = SubscriberRegistry::new(4, 1);
        let _first = registry.register().await.unwrap();

        assert!(matches!(
            registry.register().await,
            Err(RegistryError::Full { max: 1 })
        ));
    }

    #[tokio::test]
    async fn close_all_ends_queues_and_blocks_registration() {
        let registry = SubscriberRegistry::new(4, 0);
        let (_, mut rx) = registry.register().await.unwrap();

        assert_eq!(registry.close_all().await, 1);
        assert!(rx.recv().await.is_none());
        assert!(matches!(registry.register().await, Err(RegistryError::Closed)));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn full_queue_is_lagging() {
        let registry = SubscriberRegistry::new(1, 0);
        let (id, mut rx) = registry.register().await.unwrap();
        let handle = registry.list_active().await.remove(0);

        handle.deliver(frame(1)).unwrap();
        let err = handle.deliver(frame(2)).unwrap_err();
        assert!(matches!(err, DeliveryError::Lagging(got) if got == id));

        // Draining makes room again.
        assert_eq!(rx.recv().await.unwrap().version, 1);
        handle.deliver(frame(3)).unwrap();
    }

    #[tokio::test]
    async fn dropped_receiver_is_closed() {
        let registry = SubscriberRegistry::new(1, 0);
        let (id, rx) = registry.register().await.unwrap();
        drop(rx);

        let handle = registry.list_active().await.remove(0);
        assert!(matches!(
            handle.deliver(frame(1)),
            Err(DeliveryError::Closed(got)) if got == id
        ));
    }
}
