//! State shared by HTTP handlers, sessions and the broadcast loop.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::producer::SnapshotProducer;
use crate::registry::SubscriberRegistry;
use crate::store::ScoreStore;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ScoreStore>,
    pub producer: Arc<SnapshotProducer>,
    pub registry: Arc<SubscriberRegistry>,
    /// Cancelled once on shutdown; every session and the broadcast loop
    /// watch it.
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ScoreStore>) -> Self {
        let producer = Arc::new(SnapshotProducer::new(
            store.clone(),
            config.leaderboard_key.clone(),
            config.top_k,
        ));
        let registry = Arc::new(SubscriberRegistry::new(
            config.outbound_capacity,
            config.max_subscribers,
        ));

        AppState {
            config,
            store,
            producer,
            registry,
            cancel: CancellationToken::new(),
        }
    }
}
