//! Wire Protocol Implementation
//!
//! The request/response protocol is the RESP request framing: clients send
//! arrays of bulk strings, the server answers with a small set of typed
//! reply encodings.
//!
//! ## Modules
//!
//! - `types`: the [`Command`] and [`Reply`] types and reply serialization
//! - `decoder`: incremental decoding of request frames from a byte stream
//!
//! ## Example
//!
//! ```
//! use emberkv::protocol::{decode_command, Reply};
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (command, consumed) = decode_command(data).unwrap().unwrap();
//! assert_eq!(command.name(), "GET");
//! assert_eq!(consumed, data.len());
//!
//! let reply = Reply::bulk("value");
//! assert_eq!(reply.serialize(), b"$5\r\nvalue\r\n");
//! ```

pub mod decoder;
pub mod types;

// Re-export commonly used types for convenience
pub use decoder::{decode_all, decode_command, DecodeError, DecodeResult};
pub use types::{Command, Reply};
