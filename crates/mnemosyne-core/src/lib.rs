//! # Mnemosyne Core
//!
//! Core event model and store contract for the Mnemosyne audit platform.
//!
//! This crate provides the pieces shared by every storage backend:
//!
//! - [`AuditEvent`] - Structured audit record with an open field map
//! - [`AuditStore`] - Async storage contract (insert, replace, get)
//! - [`BlockingStore`] - Blocking facade with identical semantics
//! - [`JsonCodec`] - Canonical JSON encoding shared across backends
//! - [`StoreResolver`] - Per-event routing to a store target
//! - [`EventQuery`] - Filter for providers that support querying
//!
//! Backend implementations live in sibling crates (`mnemosyne-memory`,
//! `mnemosyne-file`, `mnemosyne-docstore`).
//!
//! ## Example
//!
//! ```rust
//! use mnemosyne_core::{AuditEvent, JsonCodec};
//!
//! let event = AuditEvent::new("Connect").with_field("ConnectionId", "abc123");
//!
//! let codec = JsonCodec::new();
//! let encoded = codec.encode(&event).unwrap();
//! let decoded = codec.decode(encoded.as_bytes()).unwrap();
//! assert_eq!(decoded.field_str("ConnectionId"), Some("abc123"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod event;
pub mod query;
pub mod resolver;
pub mod store;


// Re-export main types at crate root
pub use codec::{CodecError, JsonCodec, NullValuePolicy, SerializedForm};
pub use error::{Result, StoreError};
pub use event::{AuditEvent, EventMetadata, CURRENT_SCHEMA_VERSION};
pub use query::EventQuery;
pub use resolver::{StoreResolver, StoreTarget};
pub use store::{AuditStore, BlockingStore, EventId, ReplacePolicy};
