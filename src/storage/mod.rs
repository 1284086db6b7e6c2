//! Storage Module
//!
//! The key-value engine: a single-lock store with TTL-based expiration.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                   Store                      │
//! │  ┌────────────────────────────────────────┐  │
//! │  │ Mutex                                  │  │
//! │  │   entries:     key -> value            │  │
//! │  │   expirations: key -> deadline + timer │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//!                      ▲
//!                      │ remove on deadline
//!         ┌────────────┴────────────┐
//!         │  per-key timer tasks    │
//!         │  (tokio::spawn + sleep) │
//!         └─────────────────────────┘
//! ```
//!
//! Expired keys are removed two ways: the per-key timer fires at the
//! deadline, and every read path checks the deadline so a key is never
//! observable past it.

pub mod expiry;
pub mod store;

// Re-export commonly used types
pub use store::{Store, TtlResult, ValueError};
