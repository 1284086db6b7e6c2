//! Command Processing Module
//!
//! Receives decoded commands, executes them against the storage engine,
//! and produces typed replies.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ Request Decoder │  (protocol module)
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │   Dispatcher    │  (this module)
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │      Store      │  (storage module)
//! └─────────────────┘
//! ```

pub mod dispatch;

// Re-export the dispatcher
pub use dispatch::Dispatcher;
