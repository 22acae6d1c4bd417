//! Score store abstraction.
//!
//! The leaderboard itself lives in an ordered set owned by a store; the
//! server only upserts into it and reads its top slice. Two backends:
//!
//! - [`MemoryStore`]: in-process, with change notifications.
//! - [`RespStore`]: a Redis / DiceDB compatible server over RESP, with
//!   `ZRANGE.WATCH` push notifications.

mod connection;
mod memory;
mod resp;

use std::sync::Arc;

use async_trait::async_trait;
use board_core::ScoreEntry;

use crate::change::ChangeSource;
use crate::config::{Config, StoreKind};
use crate::error::StoreError;

pub use memory::MemoryStore;
pub use resp::RespStore;

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Insert or replace `entry.name` in the ordered set at `key`.
    async fn upsert(&self, key: &str, entry: &ScoreEntry) -> Result<(), StoreError>;

    /// Top `k` entries at `key`, best first. Fewer when the set is smaller.
    async fn top(&self, key: &str, k: usize) -> Result<Vec<ScoreEntry>, StoreError>;

    /// Open a change subscription on `key`.
    async fn watch(&self, _key: &str, _k: usize) -> Result<Box<dyn ChangeSource>, StoreError> {
        Err(StoreError::WatchUnsupported)
    }

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Build the store selected by `config`.
///
/// Connections are opened lazily; an unreachable RESP server shows up on
/// the first command, not here.
pub fn build_store(config: &Config) -> Arc<dyn ScoreStore> {
    match config.store {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::Resp => Arc::new(RespStore::new(
            config.store_addr.clone(),
            config.store_timeout(),
        )),
    }
}
