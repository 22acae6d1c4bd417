//! A single named score.
//!
//! Identity is the name: re-submitting a name overwrites its score
//! (last write wins, no versioning).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Largest accepted score.
///
/// Stores keep scores as IEEE-754 doubles, so anything beyond 2^53 - 1
/// would come back rounded.
pub const MAX_SCORE: i64 = (1 << 53) - 1;

/// Smallest accepted score.
pub const MIN_SCORE: i64 = -MAX_SCORE;

/// Maximum name length in bytes (UTF-8).
pub const MAX_NAME_LEN: usize = 64;

/// A named score, the unit of submission and of ranking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: i64,
}

impl ScoreEntry {
    /// Build a validated entry.
    pub fn new(name: impl Into<String>, score: i64) -> Result<Self, ValidationError> {
        let entry = ScoreEntry {
            name: name.into(),
            score,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Check the name and score rules.
    ///
    /// The name is kept exactly as given; trimming only decides emptiness.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong {
                len: self.name.len(),
                max: MAX_NAME_LEN,
            });
        }
        if self.name.chars().any(char::is_control) {
            return Err(ValidationError::InvalidName);
        }
        if !(MIN_SCORE..=MAX_SCORE).contains(&self.score) {
            return Err(ValidationError::ScoreOutOfRange(self.score));
        }
        Ok(())
    }
}

/// Total ranking order: higher score first, then name ascending.
///
/// Used everywhere a ranking is materialized so that ties never depend
/// on which store produced the data.
pub fn ranking_order(a: &ScoreEntry, b: &ScoreEntry) -> Ordering {
    b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name))
}
