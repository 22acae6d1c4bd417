//! JSON codec for the HTTP surface.
//!
//! Input (`POST /update` body → `ScoreEntry`):
//!
//! ```text
//! {"name": "alice", "score": 10}
//! ```
//!
//! `score` must be a JSON integer; fractional numbers and strings are
//! rejected. Unknown fields are ignored.
//!
//! Output (`RankingSnapshot` → push payload), best first:
//!
//! ```text
//! [{"name":"bob","score":20},{"name":"alice","score":10}]
//! ```

use board_core::{RankingSnapshot, ScoreEntry, ValidationError};
use serde::Deserialize;

use crate::error::ProtocolError;

#[derive(Debug, Deserialize)]
struct UpdateBody {
    name: String,
    score: i64,
}

/// Parse and validate a score submission.
pub fn parse_update(body: &[u8]) -> Result<ScoreEntry, ValidationError> {
    let raw: UpdateBody =
        serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    ScoreEntry::new(raw.name, raw.score)
}

/// Encode a snapshot as the JSON array pushed to subscribers.
pub fn encode_snapshot(snapshot: &RankingSnapshot) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(&snapshot.entries)?)
}

/// Decode a pushed payload back into entries (client side / tests).
pub fn decode_snapshot(text: &str) -> Result<Vec<ScoreEntry>, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}
