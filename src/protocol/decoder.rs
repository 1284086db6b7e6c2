//! Incremental Request Decoder
//!
//! Turns a byte stream into discrete [`Command`]s. TCP delivers arbitrarily
//! chunked data, so a read may contain half a frame, exactly one frame, or
//! several frames back to back. The decoder handles all three without
//! re-parsing already-consumed bytes:
//!
//! - `Ok(Some((command, consumed)))` - one complete frame was decoded and
//!   used `consumed` bytes; the caller advances its buffer by that much
//! - `Ok(None)` - the buffer ends mid-frame; the caller keeps the bytes and
//!   retries after the next read
//! - `Err(DecodeError)` - the frame is malformed; the caller reports it to
//!   the client as an error reply
//!
//! The accepted framing is the array-of-bulk-strings request format:
//! `*<n>\r\n` followed by `n` occurrences of `$<len>\r\n<bytes>\r\n`.

use crate::protocol::types::{prefix, Command, CRLF};
use thiserror::Error;

/// Errors produced by a malformed request frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The frame does not start with the array header byte
    #[error("expected array header, got {0:#04x}")]
    ExpectedArray(u8),

    /// An argument does not start with the bulk string header byte
    #[error("expected bulk string header, got {0:#04x}")]
    ExpectedBulkString(u8),

    /// A length prefix is not a valid integer
    #[error("invalid length prefix: {0:?}")]
    InvalidLength(String),

    /// The declared argument count is negative
    #[error("invalid argument count: {0}")]
    InvalidArgumentCount(i64),

    /// The declared bulk length is negative
    #[error("invalid bulk length: {0}")]
    InvalidBulkLength(i64),

    /// A bulk string payload is not terminated by CRLF where its declared
    /// length says it should be
    #[error("bulk string missing trailing CRLF")]
    MissingCrlf,

    /// A bulk string payload is not valid UTF-8 (values are strings)
    #[error("invalid UTF-8 in bulk string: {0}")]
    InvalidUtf8(String),

    /// The declared bulk length exceeds the allowed maximum
    #[error("bulk string too large: {size} bytes (max: {max})")]
    BulkTooLarge { size: usize, max: usize },
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Maximum size for a single bulk string (512 MB)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Attempts to decode one complete command from the front of `buf`.
///
/// Returns the command together with the number of bytes it occupied, or
/// `None` when the buffer ends mid-frame.
pub fn decode_command(buf: &[u8]) -> DecodeResult<Option<(Command, usize)>> {
    if buf.is_empty() {
        return Ok(None);
    }

    if buf[0] != prefix::ARRAY {
        return Err(DecodeError::ExpectedArray(buf[0]));
    }

    let (count, mut consumed) = match read_length(&buf[1..])? {
        Some((n, line_len)) => (n, 1 + line_len),
        None => return Ok(None),
    };

    if count < 0 {
        return Err(DecodeError::InvalidArgumentCount(count));
    }

    let mut parts = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match decode_bulk_string(&buf[consumed..])? {
            Some((part, used)) => {
                parts.push(part);
                consumed += used;
            }
            None => return Ok(None),
        }
    }

    Ok(Some((Command::from_parts(parts), consumed)))
}

/// Drains every complete command from `buf`.
///
/// Returns the decoded commands in order plus the number of bytes consumed;
/// a trailing partial frame is left unconsumed for the caller to retain.
pub fn decode_all(buf: &[u8]) -> DecodeResult<(Vec<Command>, usize)> {
    let mut commands = Vec::new();
    let mut consumed = 0;

    while let Some((command, used)) = decode_command(&buf[consumed..])? {
        commands.push(command);
        consumed += used;
    }

    Ok((commands, consumed))
}

/// Decodes one bulk string: `$<len>\r\n<bytes>\r\n`.
fn decode_bulk_string(buf: &[u8]) -> DecodeResult<Option<(String, usize)>> {
    if buf.is_empty() {
        return Ok(None);
    }

    if buf[0] != prefix::BULK_STRING {
        return Err(DecodeError::ExpectedBulkString(buf[0]));
    }

    let (length, header_len) = match read_length(&buf[1..])? {
        Some((n, line_len)) => (n, 1 + line_len),
        None => return Ok(None),
    };

    if length < 0 {
        return Err(DecodeError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(DecodeError::BulkTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let total = header_len + length + CRLF.len();
    if buf.len() < total {
        return Ok(None);
    }

    let data = &buf[header_len..header_len + length];
    if &buf[header_len + length..total] != CRLF {
        return Err(DecodeError::MissingCrlf);
    }

    let part = std::str::from_utf8(data)
        .map_err(|e| DecodeError::InvalidUtf8(e.to_string()))?
        .to_string();

    Ok(Some((part, total)))
}

/// Reads a CRLF-terminated decimal length line.
///
/// Returns the parsed value and the line's total length including CRLF, or
/// `None` if the terminator has not arrived yet.
fn read_length(buf: &[u8]) -> DecodeResult<Option<(i64, usize)>> {
    let pos = match find_crlf(buf) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let line = std::str::from_utf8(&buf[..pos])
        .map_err(|_| DecodeError::InvalidLength(String::from_utf8_lossy(&buf[..pos]).into_owned()))?;

    let n: i64 = line
        .parse()
        .map_err(|_| DecodeError::InvalidLength(line.to_string()))?;

    Ok(Some((n, pos + CRLF.len())))
}

/// Finds the position of `\r` in the first CRLF pair, if present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|pair| pair == CRLF)
}
