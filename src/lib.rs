//! # emberkv - A Small In-Memory Key-Value Server
//!
//! emberkv is a single-process, in-memory key-value server speaking the
//! RESP request protocol over TCP. Clients send arrays of bulk strings;
//! the server decodes commands, mutates or queries a shared store, and
//! answers with typed replies.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          emberkv                            │
//! │                                                             │
//! │  ┌────────────┐   ┌─────────────┐   ┌────────────┐          │
//! │  │ TCP        │──>│ Connection  │──>│ Dispatcher │          │
//! │  │ Listener   │   │ Handler     │   └─────┬──────┘          │
//! │  └────────────┘   └─────────────┘         │                 │
//! │                        │                  ▼                 │
//! │                   ┌────────────┐   ┌────────────────────┐   │
//! │                   │  Request   │   │       Store        │   │
//! │                   │  Decoder   │   │  entries + expiry  │   │
//! │                   └────────────┘   └─────────▲──────────┘   │
//! │                                              │              │
//! │                                  ┌───────────┴──────────┐   │
//! │                                  │  per-key expiration  │   │
//! │                                  │     timer tasks      │   │
//! │                                  └──────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `SET key value [EX seconds | PX milliseconds]`
//! - `GET key`
//! - `DEL key [key ...]`
//! - `EXISTS key [key ...]`
//! - `INCR key` / `DECR key`
//! - `EXPIRE key seconds`
//! - `TTL key`
//! - `KEYS pattern`
//!
//! ## Module Overview
//!
//! - [`protocol`]: request decoding and reply serialization
//! - [`storage`]: the shared store and its expiration registry
//! - [`commands`]: the command dispatcher
//! - [`connection`]: per-client connection handling
//!
//! ## Design Highlights
//!
//! Values are always strings; INCR and DECR parse and reformat them. The
//! store sits behind one mutex, so every command is atomic with respect to
//! concurrent connections and expiration timers. Keys with a TTL are
//! removed by a per-key timer task, and every read path double-checks the
//! deadline so an expired key is never observable.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::Dispatcher;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{decode_command, Command, DecodeError, Reply};
pub use storage::{Store, TtlResult, ValueError};

/// The default port emberkv listens on
pub const DEFAULT_PORT: u16 = 6379;

/// The default host emberkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
