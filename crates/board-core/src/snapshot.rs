//! Point-in-time top-K ranking.
//!
//! A snapshot is immutable once produced and superseded by the next one.
//! `version` grows monotonically per producer, so consumers can drop a
//! snapshot that arrives after a newer one.

use serde::Serialize;

use crate::entry::{ranking_order, ScoreEntry};

/// Number of ranked entries pushed to subscribers by default (ranks 0..=5).
pub const DEFAULT_TOP_K: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingSnapshot {
    /// Producer-assigned sequence number.
    pub version: u64,

    /// Ranked entries, best first. Never longer than the producer's K.
    pub entries: Vec<ScoreEntry>,
}

impl RankingSnapshot {
    /// Build a snapshot from entries in any order.
    ///
    /// Entries are sorted with [`ranking_order`], duplicate names keep
    /// their best-ranked occurrence, and the result is truncated to `k`.
    pub fn from_unsorted(version: u64, mut entries: Vec<ScoreEntry>, k: usize) -> Self {
        entries.sort_by(ranking_order);

        let mut seen = std::collections::HashSet::new();
        entries.retain(|e| seen.insert(e.name.clone()));
        entries.truncate(k);

        RankingSnapshot { version, entries }
    }
}
