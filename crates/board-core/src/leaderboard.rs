//! Single-key ordered set of scores.
//!
//! - Ordered by score descending, ties by name ascending.
//! - At most one entry per name; an upsert replaces the previous score.
//!
//! Two indexes are kept in lockstep: a name -> score map for identity
//! and a sorted set for rank order. The only mutation is `upsert`, which
//! updates both, so they never diverge.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use crate::entry::ScoreEntry;

/// Sort key inside the ranked index.
///
/// Field order matters: derived `Ord` compares `score` first (reversed,
/// so the highest score sorts first) and then `name` ascending.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    score: Reverse<i64>,
    name: String,
}

/// Ordered set for one leaderboard key.
#[derive(Debug, Default)]
pub struct Leaderboard {
    /// Name -> current score.
    scores: HashMap<String, i64>,

    /// Entries in rank order.
    ranked: BTreeSet<RankKey>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Leaderboard {
            scores: HashMap::new(),
            ranked: BTreeSet::new(),
        }
    }

    /// Insert or replace the score for `entry.name`.
    ///
    /// Returns the previous score if the name was already present.
    pub fn upsert(&mut self, entry: &ScoreEntry) -> Option<i64> {
        let previous = self.scores.insert(entry.name.clone(), entry.score);

        if let Some(old) = previous {
            self.ranked.remove(&RankKey {
                score: Reverse(old),
                name: entry.name.clone(),
            });
        }

        self.ranked.insert(RankKey {
            score: Reverse(entry.score),
            name: entry.name.clone(),
        });

        previous
    }

    /// The top `k` entries, highest score first.
    ///
    /// Returns fewer than `k` entries when the board is smaller.
    pub fn top(&self, k: usize) -> Vec<ScoreEntry> {
        self.ranked
            .iter()
            .take(k)
            .map(|rk| ScoreEntry {
                name: rk.name.clone(),
                score: rk.score.0,
            })
            .collect()
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
