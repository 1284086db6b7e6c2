//! Wire Protocol Data Types
//!
//! Requests and replies are asymmetric on the wire. A request is always an
//! array of bulk strings (`*<n>\r\n` followed by `n` length-prefixed
//! strings); a reply is one of a small set of typed encodings.
//!
//! ## Reply Format
//!
//! Each reply starts with a type prefix byte and ends with CRLF (`\r\n`):
//! - `+` simple status, e.g. `+OK\r\n`
//! - `-` error, e.g. `-ERR unknown command\r\n`
//! - `:` integer, e.g. `:42\r\n`
//! - `$` bulk string, e.g. `$5\r\nhello\r\n`; the null bulk is `$-1\r\n`
//! - `*` array, e.g. `*2\r\n$3\r\nabc\r\n$3\r\nabd\r\n`

use std::fmt;

/// The CRLF terminator used throughout the protocol
pub const CRLF: &[u8] = b"\r\n";

/// Protocol type prefixes
pub mod prefix {
    pub const STATUS: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A decoded client request: an ordered sequence of string arguments where
/// the first element is the verb.
///
/// Commands are ephemeral. One is constructed per decoded frame, handed to
/// the dispatcher, and dropped once the reply is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    parts: Vec<String>,
}

impl Command {
    /// Creates a command from its decoded parts (verb first).
    pub fn from_parts(parts: Vec<String>) -> Self {
        Self { parts }
    }

    /// The verb, uppercased for case-insensitive dispatch.
    ///
    /// An empty frame (`*0\r\n`) has no verb and yields an empty string,
    /// which dispatches to the unknown-command path.
    pub fn name(&self) -> String {
        self.parts.first().map(|s| s.to_uppercase()).unwrap_or_default()
    }

    /// The arguments following the verb.
    pub fn args(&self) -> &[String] {
        if self.parts.is_empty() {
            &[]
        } else {
            &self.parts[1..]
        }
    }

    /// All parts including the verb.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Re-encodes the command in request framing: `*N\r\n` followed by one
    /// bulk string per part.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(prefix::ARRAY);
        buf.extend_from_slice(self.parts.len().to_string().as_bytes());
        buf.extend_from_slice(CRLF);
        for part in &self.parts {
            buf.push(prefix::BULK_STRING);
            buf.extend_from_slice(part.len().to_string().as_bytes());
            buf.extend_from_slice(CRLF);
            buf.extend_from_slice(part.as_bytes());
            buf.extend_from_slice(CRLF);
        }
        buf
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join(" "))
    }
}

/// A typed reply value, produced per command and serialized once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Simple status line. Format: `+<status>\r\n`
    Status(String),

    /// 64-bit signed integer. Format: `:<n>\r\n`
    Integer(i64),

    /// Bulk string, or the null bulk for an absent value.
    /// Format: `$<len>\r\n<data>\r\n`, null: `$-1\r\n`
    Bulk(Option<String>),

    /// Array of replies. Format: `*<count>\r\n<items...>`
    Array(Vec<Reply>),

    /// Error reply. Format: `-ERR <message>\r\n`
    Error(String),
}

impl Reply {
    /// The `+OK` status shared by successful writes.
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// A present bulk string.
    pub fn bulk(s: impl Into<String>) -> Self {
        Reply::Bulk(Some(s.into()))
    }

    /// The null bulk string.
    pub fn null() -> Self {
        Reply::Bulk(None)
    }

    /// An error reply. The `ERR ` prefix is added at serialization time.
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    pub fn integer(n: i64) -> Self {
        Reply::Integer(n)
    }

    pub fn array(items: Vec<Reply>) -> Self {
        Reply::Array(items)
    }

    /// Serializes the reply to its exact wire bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes into an existing buffer, reusing its allocation.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Status(s) => {
                buf.push(prefix::STATUS);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Bulk(Some(s)) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(s.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Bulk(None) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Reply::Array(items) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(items.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for item in items {
                    item.serialize_into(buf);
                }
            }
            Reply::Error(message) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(b"ERR ");
                buf.extend_from_slice(message.as_bytes());
                buf.extend_from_slice(CRLF);
            }
        }
    }

    /// Returns true if this reply is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serialize() {
        assert_eq!(Reply::ok().serialize(), b"+OK\r\n");
    }

    #[test]
    fn integer_serialize() {
        assert_eq!(Reply::integer(1000).serialize(), b":1000\r\n");
        assert_eq!(Reply::integer(-2).serialize(), b":-2\r\n");
    }

    #[test]
    fn bulk_serialize() {
        assert_eq!(Reply::bulk("hello").serialize(), b"$5\r\nhello\r\n");
        assert_eq!(Reply::bulk("").serialize(), b"$0\r\n\r\n");
    }

    #[test]
    fn null_bulk_serialize() {
        assert_eq!(Reply::null().serialize(), b"$-1\r\n");
    }

    #[test]
    fn array_serialize() {
        let reply = Reply::array(vec![Reply::bulk("abc"), Reply::bulk("abd")]);
        assert_eq!(reply.serialize(), b"*2\r\n$3\r\nabc\r\n$3\r\nabd\r\n");
    }

    #[test]
    fn empty_array_serialize() {
        assert_eq!(Reply::array(vec![]).serialize(), b"*0\r\n");
    }

    #[test]
    fn error_serialize() {
        let reply = Reply::error("unknown command");
        assert_eq!(reply.serialize(), b"-ERR unknown command\r\n");
    }

    #[test]
    fn command_name_is_case_insensitive() {
        let cmd = Command::from_parts(vec!["get".into(), "name".into()]);
        assert_eq!(cmd.name(), "GET");
        assert_eq!(cmd.args(), &["name".to_string()]);
    }

    #[test]
    fn empty_command_has_no_verb() {
        let cmd = Command::from_parts(vec![]);
        assert_eq!(cmd.name(), "");
        assert!(cmd.args().is_empty());
    }

    #[test]
    fn command_to_wire() {
        let cmd = Command::from_parts(vec!["SET".into(), "key".into(), "value".into()]);
        assert_eq!(
            cmd.to_wire(),
            b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n"
        );
    }
}
