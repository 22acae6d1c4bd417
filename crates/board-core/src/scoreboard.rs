//! Multi-key host for leaderboards.
//!
//! Maintains one [`Leaderboard`] per key, created on first write.
//! Reads of an unknown key behave like reads of an empty board.

use std::collections::HashMap;

use crate::entry::ScoreEntry;
use crate::leaderboard::Leaderboard;

#[derive(Debug, Default)]
pub struct Scoreboard {
    boards: HashMap<String, Leaderboard>,
}

impl Scoreboard {
    /// Create a new, empty scoreboard.
    pub fn new() -> Self {
        Scoreboard::default()
    }

    /// Upsert into the board for `key`, creating it if needed.
    ///
    /// Returns the previous score for the name, if any.
    pub fn upsert(&mut self, key: &str, entry: &ScoreEntry) -> Option<i64> {
        self.get_or_create_board(key).upsert(entry)
    }

    /// Top `k` entries of `key`; empty for unknown keys.
    pub fn top(&self, key: &str, k: usize) -> Vec<ScoreEntry> {
        self.boards
            .get(key)
            .map(|board| board.top(k))
            .unwrap_or_default()
    }

    fn get_or_create_board(&mut self, key: &str) -> &mut Leaderboard {
        self.boards
            .entry(key.to_string())
            .or_default()
    }

    /// Read access to the board for `key`, if it has been written.
    pub fn get_board(&self, key: &str) -> Option<&Leaderboard> {
        self.boards.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_independent() {
        let mut sb = Scoreboard::new();
        sb.upsert("daily", &ScoreEntry::new("a", 1).unwrap());
        sb.upsert("weekly", &ScoreEntry::new("a", 100).unwrap());

        assert_eq!(sb.get_board("daily").map(|b| b.len()), Some(1));
        assert_eq!(sb.top("daily", 6)[0].score, 1);
        assert_eq!(sb.top("weekly", 6)[0].score, 100);
    }

    #[test]
    fn unknown_key_reads_empty() {
        let sb = Scoreboard::new();
        assert!(sb.top("missing", 6).is_empty());
        assert!(sb.get_board("missing").is_none());
    }
}
