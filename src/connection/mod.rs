//! Connection Module
//!
//! Manages individual client connections. The listener (in `main.rs`)
//! accepts sockets and spawns one handler task per client:
//!
//! ```text
//! ┌──────────────┐  accept   ┌───────────────────────────────────┐
//! │ TCP Listener │──────────>│        ConnectionHandler          │
//! └──────────────┘  (spawn)  │ read -> decode -> execute -> send │
//!                            └───────────────────────────────────┘
//! ```
//!
//! The handler owns the per-connection read buffer, so a partial frame
//! left by one read is completed by the next without re-parsing.

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
