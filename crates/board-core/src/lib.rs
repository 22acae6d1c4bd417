//! board-core
//!
//! Pure leaderboard logic:
//! - score entries and their validation rules
//! - per-key ordered set (score descending, name ascending on ties)
//! - multi-key scoreboard
//! - immutable top-K ranking snapshots

pub mod entry;
pub mod error;
pub mod leaderboard;
pub mod scoreboard;
pub mod snapshot;

pub use entry::{ranking_order, ScoreEntry, MAX_NAME_LEN, MAX_SCORE, MIN_SCORE};
pub use error::ValidationError;
pub use leaderboard::Leaderboard;
pub use scoreboard::Scoreboard;
pub use snapshot::{RankingSnapshot, DEFAULT_TOP_K};
