//! Shared types for the leaderboard server.
//!
//! This module defines:
//! - `SubscriberId`: a lightweight handle for connected push clients
//! - `SnapshotFrame`: a snapshot already encoded for the push channel
//! - channel aliases between the broadcaster and subscriber sessions

use std::fmt;
use std::sync::Arc;

use board_core::RankingSnapshot;
use board_protocol::{encode_snapshot, ProtocolError};
use tokio::sync::mpsc;

/// Identifier for a connected subscriber.
///
/// This is intentionally opaque; we just guarantee uniqueness
/// over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A snapshot serialized once per broadcast round and shared by every
/// subscriber queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFrame {
    pub version: u64,
    pub json: Arc<str>,
}

impl SnapshotFrame {
    pub fn encode(snapshot: &RankingSnapshot) -> Result<Self, ProtocolError> {
        Ok(SnapshotFrame {
            version: snapshot.version,
            json: Arc::from(encode_snapshot(snapshot)?),
        })
    }
}

/// Outbound snapshots from the broadcaster to a given subscriber.
pub type OutboundTx = mpsc::Sender<SnapshotFrame>;
pub type OutboundRx = mpsc::Receiver<SnapshotFrame>;
