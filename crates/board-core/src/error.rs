//! Error types for the leaderboard core.
//!
//! The core API is infallible once an entry exists; the only failure
//! mode is a submission that does not describe a valid entry.

use thiserror::Error;

/// A score submission that cannot become a [`ScoreEntry`](crate::ScoreEntry).
///
/// Never touches the store: validation happens before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The name is empty (or whitespace only).
    #[error("name must not be empty")]
    EmptyName,

    /// The name is longer than the allowed number of bytes.
    #[error("name is {len} bytes, maximum is {max}")]
    NameTooLong { len: usize, max: usize },

    /// The name contains control characters.
    #[error("name contains control characters")]
    InvalidName,

    /// The score cannot be represented exactly by the store.
    #[error("score {0} is outside the accepted range")]
    ScoreOutOfRange(i64),

    /// The payload itself could not be decoded.
    #[error("malformed submission: {0}")]
    Malformed(String),
}
