use thiserror::Error;

/// Errors that can arise when decoding store frames or encoding payloads.
///
/// A `ProtocolError` on a watch notification skips that notification
/// only; it never tears down the fan-out loop.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Unknown RESP type marker.
    #[error("unknown frame type byte: 0x{0:02x}")]
    UnknownType(u8),

    /// A length or integer header did not parse.
    #[error("invalid integer in frame header")]
    InvalidInteger,

    /// Declared length is negative (other than null) or over the limit.
    #[error("invalid frame length: {0}")]
    InvalidLength(i64),

    /// Bulk payload not terminated by CRLF.
    #[error("missing CRLF terminator")]
    MissingTerminator,

    /// Aggregates nested deeper than we accept.
    #[error("frame nesting exceeds {0} levels")]
    TooDeep(usize),

    /// Text field was not valid UTF-8.
    #[error("invalid UTF-8 in frame")]
    InvalidUtf8,

    /// A ranking reply had an element of the wrong type.
    #[error("unexpected {found} at position {index} in ranking reply")]
    UnexpectedElement { index: usize, found: &'static str },

    /// A flattened member/score reply had an odd number of elements.
    #[error("ranking reply has odd length {0}")]
    OddLength(usize),

    /// A score element could not be read as a number.
    #[error("invalid score value: {0}")]
    InvalidScore(String),

    /// The frame did not have the shape expected for this exchange.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// JSON encoding/decoding failure.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
