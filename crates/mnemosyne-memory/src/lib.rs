//! # Mnemosyne Memory
//!
//! In-memory audit store: the reference implementation of the
//! [`AuditStore`](mnemosyne_core::AuditStore) contract and the test double
//! for code that persists audit events.
//!
//! Events are held per target behind a read-write lock; identifiers are
//! assigned sequentially in `events/{n}-A` form. Nothing is durable beyond
//! the process.
//!
//! ## Example
//!
//! ```rust
//! use mnemosyne_core::{AuditEvent, AuditStore};
//! use mnemosyne_memory::MemoryStore;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = MemoryStore::new();
//!
//! let event = AuditEvent::new("Connect").with_field("ConnectionId", "abc123");
//! let id = store.insert(&event).await.unwrap();
//!
//! let loaded = store.get(&id).await.unwrap();
//! assert_eq!(loaded.field_str("ConnectionId"), Some("abc123"));
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod store;

pub use store::MemoryStore;
