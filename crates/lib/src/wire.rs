//! Length-prefixed line codec for the client protocol.
//!
//! Every line of a message is terminated by a carriage-return/line-feed pair,
//! and a complete message is terminated by one extra bare line feed. Requests
//! arrive either as arrays of bulk strings (`*n`, then `$len`/content pairs)
//! or as a single inline line split on whitespace. Replies are built from the
//! usual line kinds: simple strings (`+`), errors (`-`), integers (`:`), bulk
//! strings (`$len`), and arrays (`*n`).

use std::fmt::Write as _;

use thiserror::Error as ThisError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Errors produced while framing or decoding client messages.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum WireError {
    /// The connection closed in the middle of a message.
    #[error("connection closed mid-message")]
    UnexpectedEof,

    /// A `*` or `$` length prefix did not parse as a number.
    #[error("invalid length prefix: {line}")]
    InvalidLength {
        /// The offending line
        line: String,
    },

    /// The message structure did not match the protocol.
    #[error("malformed message: {reason}")]
    Malformed {
        /// Description of the structural problem
        reason: String,
    },
}

impl WireError {
    /// Check if this error indicates the peer hung up mid-message.
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, WireError::UnexpectedEof)
    }
}

impl From<WireError> for crate::Error {
    fn from(err: WireError) -> Self {
        crate::Error::Wire(err)
    }
}

/// Read one complete message from the connection.
///
/// Returns the message's lines with line terminators stripped, `Ok(None)` on
/// a clean end-of-stream between messages, and `WireError::UnexpectedEof` if
/// the stream ends inside a message.
pub async fn read_message<R>(reader: &mut R) -> crate::Result<Option<Vec<String>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    let mut buf = String::new();

    loop {
        buf.clear();
        let n = reader.read_line(&mut buf).await?;
        if n == 0 {
            if lines.is_empty() {
                return Ok(None);
            }
            return Err(WireError::UnexpectedEof.into());
        }

        let line = buf.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            // The bare terminator line. Tolerate stray blank lines between
            // messages rather than producing empty commands.
            if lines.is_empty() {
                continue;
            }
            return Ok(Some(lines));
        }
        lines.push(line.to_string());
    }
}

/// Decode a framed message into its argument vector.
pub fn decode(lines: &[String]) -> crate::Result<Vec<String>> {
    let first = lines.first().ok_or_else(|| WireError::Malformed {
        reason: "empty message".to_string(),
    })?;

    if let Some(count) = first.strip_prefix('*') {
        let count: usize = count.parse().map_err(|_| WireError::InvalidLength {
            line: first.clone(),
        })?;
        let mut args = Vec::with_capacity(count);
        let mut i = 1;
        for _ in 0..count {
            let len_line = lines.get(i).ok_or(WireError::UnexpectedEof)?;
            let len: usize = len_line
                .strip_prefix('$')
                .and_then(|l| l.parse().ok())
                .ok_or_else(|| WireError::InvalidLength {
                    line: len_line.clone(),
                })?;
            let content = lines.get(i + 1).ok_or(WireError::UnexpectedEof)?;
            if content.len() != len {
                return Err(WireError::Malformed {
                    reason: format!("bulk length {len} does not match content"),
                }
                .into());
            }
            args.push(content.clone());
            i += 2;
        }
        if args.is_empty() {
            return Err(WireError::Malformed {
                reason: "empty command array".to_string(),
            }
            .into());
        }
        return Ok(args);
    }

    // Inline form: whitespace-separated tokens on a single line.
    let args: Vec<String> = first.split_whitespace().map(str::to_string).collect();
    if args.is_empty() {
        return Err(WireError::Malformed {
            reason: "empty command".to_string(),
        }
        .into());
    }
    Ok(args)
}

/// `+OK` reply.
pub fn ok() -> Vec<u8> {
    simple_string("OK")
}

/// Simple string reply.
pub fn simple_string(s: impl AsRef<str>) -> Vec<u8> {
    format!("+{}\r\n\n", s.as_ref()).into_bytes()
}

/// Error reply.
pub fn error(msg: impl std::fmt::Display) -> Vec<u8> {
    format!("-Error {msg}\r\n\n").into_bytes()
}

/// Integer reply.
pub fn integer(n: i64) -> Vec<u8> {
    format!(":{n}\r\n\n").into_bytes()
}

/// Array of bulk strings.
pub fn bulk_array<I, S>(items: I) -> Vec<u8>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items: Vec<S> = items.into_iter().collect();
    let mut out = format!("*{}", items.len());
    for item in &items {
        let item = item.as_ref();
        let _ = write!(out, "\r\n${}\r\n{}", item.len(), item);
    }
    out.push_str("\r\n\n");
    out.into_bytes()
}

/// Array of simple strings.
pub fn simple_array<I, S>(items: I) -> Vec<u8>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items: Vec<S> = items.into_iter().collect();
    let mut out = format!("*{}", items.len());
    for item in &items {
        let _ = write!(out, "\r\n+{}", item.as_ref());
    }
    out.push_str("\r\n\n");
    out.into_bytes()
}
