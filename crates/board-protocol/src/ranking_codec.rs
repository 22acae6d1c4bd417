//! Store replies → ranked entries.
//!
//! A `WITHSCORES` range reply comes in one of two shapes:
//!
//! ```text
//! RESP2: [member, score, member, score, ...]      (flattened)
//! RESP3: [[member, score], [member, score], ...]  (pairs)
//! ```
//!
//! Members are strings; scores are strings, integers or doubles.
//! Fractional scores are truncated toward zero.
//!
//! A watch subscription delivers push frames of the form
//! `[command, fingerprint, data]` where `data` is a range reply.

use board_core::ScoreEntry;

use crate::error::ProtocolError;
use crate::resp::RespValue;

/// One frame read from a watch connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchFrame {
    /// Subscription acknowledgement; carries no ranking.
    Ack,
    /// The watched query's new result.
    Update(Vec<ScoreEntry>),
}

/// Decode a `WITHSCORES` range reply.
pub fn decode_ranking(value: &RespValue) -> Result<Vec<ScoreEntry>, ProtocolError> {
    let items = match value {
        RespValue::Null => return Ok(Vec::new()),
        RespValue::Array(items) | RespValue::Push(items) => items,
        other => {
            return Err(ProtocolError::UnexpectedElement {
                index: 0,
                found: other.kind(),
            })
        }
    };

    if items.iter().all(|item| matches!(item, RespValue::Array(_))) && !items.is_empty() {
        return items
            .iter()
            .enumerate()
            .map(|(index, pair)| match pair.as_items() {
                Some([member, score]) => decode_pair(index * 2, member, score),
                _ => Err(ProtocolError::UnexpectedElement {
                    index,
                    found: "malformed pair",
                }),
            })
            .collect();
    }

    if items.len() % 2 != 0 {
        return Err(ProtocolError::OddLength(items.len()));
    }

    items
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| decode_pair(i * 2, &pair[0], &pair[1]))
        .collect()
}

/// Decode one frame received on a watch connection.
pub fn decode_watch_frame(value: &RespValue) -> Result<WatchFrame, ProtocolError> {
    match value {
        RespValue::Simple(_) => Ok(WatchFrame::Ack),
        RespValue::Error(msg) => Err(ProtocolError::UnexpectedReply(msg.clone())),
        RespValue::Array(items) | RespValue::Push(items) => match items.as_slice() {
            [command, _fingerprint, data] if command.as_text().is_some() => {
                decode_ranking(data).map(WatchFrame::Update)
            }
            _ => Err(ProtocolError::UnexpectedReply(format!(
                "watch frame with {} elements",
                items.len()
            ))),
        },
        other => Err(ProtocolError::UnexpectedReply(format!(
            "watch frame of type {}",
            other.kind()
        ))),
    }
}

fn decode_pair(
    index: usize,
    member: &RespValue,
    score: &RespValue,
) -> Result<ScoreEntry, ProtocolError> {
    let name = member
        .as_text()
        .ok_or(ProtocolError::UnexpectedElement {
            index,
            found: member.kind(),
        })?
        .to_string();

    let score = match score {
        RespValue::Integer(i) => *i,
        RespValue::Double(d) => float_score(*d)?,
        RespValue::Simple(_) | RespValue::Bulk(_) => {
            let text = score.as_text().ok_or(ProtocolError::InvalidUtf8)?;
            match text.parse::<i64>() {
                Ok(i) => i,
                Err(_) => float_score(
                    text.parse::<f64>()
                        .map_err(|_| ProtocolError::InvalidScore(text.to_string()))?,
                )?,
            }
        }
        other => {
            return Err(ProtocolError::UnexpectedElement {
                index: index + 1,
                found: other.kind(),
            })
        }
    };

    Ok(ScoreEntry { name, score })
}

fn float_score(value: f64) -> Result<i64, ProtocolError> {
    if !value.is_finite() {
        return Err(ProtocolError::InvalidScore(value.to_string()));
    }
    Ok(value.trunc() as i64)
}
