//! Store command vocabulary.
//!
//! The leaderboard needs only a handful of ordered-set commands:
//!
//! - `ZADD key score member`                          upsert
//! - `ZRANGE key 0 k-1 REV WITHSCORES`                top-K, best first
//! - `ZRANGE.WATCH key 0 k-1 REV WITHSCORES`          same query, re-pushed
//!                                                    on every change
//!
//! Scores travel as decimal strings.

use board_core::ScoreEntry;

use crate::resp::Command;

pub const ZADD: &str = "ZADD";
pub const ZRANGE: &str = "ZRANGE";
pub const ZRANGE_WATCH: &str = "ZRANGE.WATCH";

pub const REV: &str = "REV";
pub const WITHSCORES: &str = "WITHSCORES";

/// `ZADD key score member`.
pub fn zadd(key: &str, entry: &ScoreEntry) -> Command {
    Command::new(ZADD)
        .arg(key)
        .arg(entry.score.to_string())
        .arg(&entry.name)
}

/// `ZRANGE key 0 k-1 REV WITHSCORES`.
///
/// `k` must be at least 1; a stop index of -1 would mean "everything".
pub fn zrange_top(key: &str, k: usize) -> Command {
    top_query(ZRANGE, key, k)
}

/// `ZRANGE.WATCH key 0 k-1 REV WITHSCORES`.
pub fn zrange_watch(key: &str, k: usize) -> Command {
    top_query(ZRANGE_WATCH, key, k)
}

fn top_query(name: &str, key: &str, k: usize) -> Command {
    let stop = k.max(1) - 1;
    Command::new(name)
        .arg(key)
        .arg("0")
        .arg(stop.to_string())
        .arg(REV)
        .arg(WITHSCORES)
}
