//! RESP framing for the external ordered-set store.
//!
//! Supports the RESP2 types plus the RESP3 additions a watch-capable
//! store may push back:
//!
//! ```text
//! +OK\r\n                    simple string
//! -ERR message\r\n           error
//! :42\r\n                    integer
//! $5\r\nalice\r\n            bulk string   ($-1\r\n = null)
//! *2\r\n...                  array         (*-1\r\n = null)
//! ,1.5\r\n                   double
//! #t\r\n                     boolean
//! _\r\n                      null
//! >3\r\n...                  push
//! ```
//!
//! Commands are always sent as arrays of bulk strings.
//!
//! [`decode_frame`] is incremental: on a partial buffer it returns
//! `Ok(None)` and consumes nothing, so a connection can keep reading
//! and retry.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Largest bulk string we accept (matches the usual server limit).
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Largest aggregate element count we accept.
pub const MAX_AGGREGATE_LEN: i64 = 1 << 20;

/// Maximum nesting of aggregates.
pub const MAX_DEPTH: usize = 32;

const CRLF: &[u8] = b"\r\n";

/// A decoded RESP value.
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<RespValue>),
    Double(f64),
    Boolean(bool),
    Push(Vec<RespValue>),
}

impl RespValue {
    /// Short type name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::Simple(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::Bulk(_) => "bulk string",
            RespValue::Null => "null",
            RespValue::Array(_) => "array",
            RespValue::Double(_) => "double",
            RespValue::Boolean(_) => "boolean",
            RespValue::Push(_) => "push",
        }
    }

    /// Text content of a simple or bulk string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RespValue::Simple(s) => Some(s),
            RespValue::Bulk(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Elements of an array or push frame.
    pub fn as_items(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(items) | RespValue::Push(items) => Some(items),
            _ => None,
        }
    }

    pub fn bulk(data: impl AsRef<[u8]>) -> Self {
        RespValue::Bulk(Bytes::copy_from_slice(data.as_ref()))
    }
}

/// A store command: name followed by arguments, all sent as bulk strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: &str) -> Self {
        Command {
            args: vec![Bytes::copy_from_slice(name.as_bytes())],
        }
    }

    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(Bytes::copy_from_slice(arg.as_ref()));
        self
    }

    /// The command name (first element), upper-cased.
    pub fn name(&self) -> String {
        self.args
            .first()
            .map(|b| String::from_utf8_lossy(b).to_ascii_uppercase())
            .unwrap_or_default()
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Append the wire form of this command to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(b'*');
        buf.put_slice(self.args.len().to_string().as_bytes());
        buf.put_slice(CRLF);
        for arg in &self.args {
            put_bulk(buf, arg);
        }
    }

    /// Interpret a decoded frame as a command (server side).
    ///
    /// Returns `None` unless the frame is a non-empty array of strings.
    pub fn from_value(value: &RespValue) -> Option<Command> {
        let items = match value {
            RespValue::Array(items) if !items.is_empty() => items,
            _ => return None,
        };
        let mut args = Vec::with_capacity(items.len());
        for item in items {
            match item {
                RespValue::Bulk(b) => args.push(b.clone()),
                RespValue::Simple(s) => args.push(Bytes::copy_from_slice(s.as_bytes())),
                _ => return None,
            }
        }
        Some(Command { args })
    }
}

/// Try to decode one complete frame from the front of `buf`.
///
/// On success the frame's bytes are consumed. Returns `Ok(None)` when
/// more data is needed.
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<RespValue>, ProtocolError> {
    match parse(&buf[..], 0)? {
        Some((value, used)) => {
            buf.advance(used);
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Append the wire form of `value` to `buf`.
pub fn encode_value(value: &RespValue, buf: &mut BytesMut) {
    match value {
        RespValue::Simple(s) => put_line(buf, b'+', s.as_bytes()),
        RespValue::Error(s) => put_line(buf, b'-', s.as_bytes()),
        RespValue::Integer(i) => put_line(buf, b':', i.to_string().as_bytes()),
        RespValue::Bulk(b) => put_bulk(buf, b),
        RespValue::Null => buf.put_slice(b"_\r\n"),
        RespValue::Double(d) => put_line(buf, b',', d.to_string().as_bytes()),
        RespValue::Boolean(b) => put_line(buf, b'#', if *b { b"t" } else { b"f" }),
        RespValue::Array(items) => put_aggregate(buf, b'*', items),
        RespValue::Push(items) => put_aggregate(buf, b'>', items),
    }
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn put_line(buf: &mut BytesMut, marker: u8, body: &[u8]) {
    buf.put_u8(marker);
    buf.put_slice(body);
    buf.put_slice(CRLF);
}

fn put_bulk(buf: &mut BytesMut, data: &[u8]) {
    put_line(buf, b'$', data.len().to_string().as_bytes());
    buf.put_slice(data);
    buf.put_slice(CRLF);
}

fn put_aggregate(buf: &mut BytesMut, marker: u8, items: &[RespValue]) {
    put_line(buf, marker, items.len().to_string().as_bytes());
    for item in items {
        encode_value(item, buf);
    }
}

/// Parse one frame from `buf`, returning it and the number of bytes used.
fn parse(buf: &[u8], depth: usize) -> Result<Option<(RespValue, usize)>, ProtocolError> {
    if depth > MAX_DEPTH {
        return Err(ProtocolError::TooDeep(MAX_DEPTH));
    }

    let Some(&marker) = buf.first() else {
        return Ok(None);
    };
    let Some((line, line_len)) = read_line(&buf[1..]) else {
        return Ok(None);
    };
    let mut pos = 1 + line_len;

    let value = match marker {
        b'+' => RespValue::Simple(utf8(line)?),
        b'-' => RespValue::Error(utf8(line)?),
        b':' => RespValue::Integer(parse_int(line)?),
        b',' => RespValue::Double(
            utf8(line)?
                .parse::<f64>()
                .map_err(|_| ProtocolError::InvalidScore(String::from_utf8_lossy(line).into()))?,
        ),
        b'#' => match line {
            b"t" => RespValue::Boolean(true),
            b"f" => RespValue::Boolean(false),
            _ => return Err(ProtocolError::UnexpectedReply("invalid boolean".into())),
        },
        b'_' => RespValue::Null,
        b'$' => {
            let len = parse_int(line)?;
            if len == -1 {
                RespValue::Null
            } else {
                if !(0..=MAX_BULK_LEN).contains(&len) {
                    return Err(ProtocolError::InvalidLength(len));
                }
                let len = len as usize;
                let rest = &buf[pos..];
                if rest.len() < len + CRLF.len() {
                    return Ok(None);
                }
                if &rest[len..len + CRLF.len()] != CRLF {
                    return Err(ProtocolError::MissingTerminator);
                }
                pos += len + CRLF.len();
                RespValue::Bulk(Bytes::copy_from_slice(&rest[..len]))
            }
        }
        b'*' | b'>' => {
            let len = parse_int(line)?;
            if len == -1 && marker == b'*' {
                RespValue::Null
            } else {
                if !(0..=MAX_AGGREGATE_LEN).contains(&len) {
                    return Err(ProtocolError::InvalidLength(len));
                }
                let mut items = Vec::with_capacity((len as usize).min(64));
                for _ in 0..len {
                    match parse(&buf[pos..], depth + 1)? {
                        Some((item, used)) => {
                            items.push(item);
                            pos += used;
                        }
                        None => return Ok(None),
                    }
                }
                if marker == b'*' {
                    RespValue::Array(items)
                } else {
                    RespValue::Push(items)
                }
            }
        }
        other => return Err(ProtocolError::UnknownType(other)),
    };

    Ok(Some((value, pos)))
}

/// Returns the line body (without CRLF) and the length including CRLF.
fn read_line(buf: &[u8]) -> Option<(&[u8], usize)> {
    let idx = buf.windows(2).position(|w| w == CRLF)?;
    Some((&buf[..idx], idx + CRLF.len()))
}

fn utf8(bytes: &[u8]) -> Result<String, ProtocolError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| ProtocolError::InvalidUtf8)
}

fn parse_int(bytes: &[u8]) -> Result<i64, ProtocolError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(ProtocolError::InvalidInteger)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<RespValue> {
        let mut buf = BytesMut::from(bytes);
        let mut out = Vec::new();
        while let Some(v) = decode_frame(&mut buf).unwrap() {
            out.push(v);
        }
        assert!(buf.is_empty(), "left over: {:?}", buf);
        out
    }

    #[test]
    fn encodes_command_as_bulk_array() {
        let mut buf = BytesMut::new();
        Command::new("ZADD")
            .arg("leaderboard")
            .arg("10")
            .arg("alice")
            .encode(&mut buf);

        assert_eq!(
            &buf[..],
            b"*4\r\n$4\r\nZADD\r\n$11\r\nleaderboard\r\n$2\r\n10\r\n$5\r\nalice\r\n"
        );
    }

    #[test]
    fn decodes_scalar_types() {
        let values = decode_all(b"+OK\r\n-ERR bad\r\n:7\r\n$3\r\nabc\r\n$-1\r\n,2.5\r\n#f\r\n_\r\n");
        assert_eq!(
            values,
            vec![
                RespValue::Simple("OK".into()),
                RespValue::Error("ERR bad".into()),
                RespValue::Integer(7),
                RespValue::bulk("abc"),
                RespValue::Null,
                RespValue::Double(2.5),
                RespValue::Boolean(false),
                RespValue::Null,
            ]
        );
    }

    #[test]
    fn decodes_nested_aggregates() {
        let values = decode_all(b">3\r\n$12\r\nZRANGE.WATCH\r\n:99\r\n*2\r\n$1\r\na\r\n$1\r\n1\r\n");
        assert_eq!(
            values,
            vec![RespValue::Push(vec![
                RespValue::bulk("ZRANGE.WATCH"),
                RespValue::Integer(99),
                RespValue::Array(vec![RespValue::bulk("a"), RespValue::bulk("1")]),
            ])]
        );
    }

    #[test]
    fn partial_frames_consume_nothing() {
        let full = b"*2\r\n$5\r\nalice\r\n$2\r\n10\r\n";
        for cut in 0..full.len() {
            let mut buf = BytesMut::from(&full[..cut]);
            assert_eq!(decode_frame(&mut buf).unwrap(), None, "cut at {cut}");
            assert_eq!(buf.len(), cut);
        }
        let mut buf = BytesMut::from(&full[..]);
        assert!(decode_frame(&mut buf).unwrap().is_some());
    }

    #[test]
    fn rejects_garbage() {
        let mut buf = BytesMut::from(&b"!oops\r\n"[..]);
        assert!(matches!(
            decode_frame(&mut buf),
            Err(ProtocolError::UnknownType(b'!'))
        ));

        let mut buf = BytesMut::from(&b"$3\r\nabcXY"[..]);
        assert!(matches!(
            decode_frame(&mut buf),
            Err(ProtocolError::MissingTerminator)
        ));

        let mut buf = BytesMut::from(&b"*-5\r\n"[..]);
        assert!(matches!(
            decode_frame(&mut buf),
            Err(ProtocolError::InvalidLength(-5))
        ));
    }

    #[test]
    fn command_from_value_round_trips() {
        let cmd = Command::new("zrange").arg("lb").arg("0").arg("5");
        let mut buf = BytesMut::new();
        cmd.encode(&mut buf);

        let value = decode_frame(&mut buf).unwrap().unwrap();
        let parsed = Command::from_value(&value).unwrap();
        assert_eq!(parsed, cmd);
        assert_eq!(parsed.name(), "ZRANGE");
    }

    #[test]
    fn encode_value_matches_decoder() {
        let value = RespValue::Array(vec![
            RespValue::Simple("OK".into()),
            RespValue::Integer(-1),
            RespValue::Null,
        ]);
        let mut buf = BytesMut::new();
        encode_value(&value, &mut buf);
        assert_eq!(decode_all(&buf), vec![value]);
    }
}
