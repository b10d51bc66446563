//! # Mnemosyne Docstore
//!
//! Audit store backed by an externally operated HTTP document database.
//! Documents are posted to a per-database collection and the backend
//! assigns identifiers (`events/1-A` style); retrieval runs the returned
//! bytes through the canonical codec so stored documents stay
//! byte-comparable with every other backend.
//!
//! Each operation opens a scoped session carrying a request ID; the
//! session is closed on every exit path.
//!
//! ## Example
//!
//! ```no_run
//! use mnemosyne_core::{AuditEvent, AuditStore};
//! use mnemosyne_docstore::{DocStore, DocStoreAuth, DocStoreConfig};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let config = DocStoreConfig::new("https://docs.example.com")
//!     .with_database("audit")
//!     .with_auth(DocStoreAuth::bearer("token"));
//! let store = DocStore::new(config).unwrap();
//!
//! let event = AuditEvent::new("Connect").with_field("ConnectionId", "abc123");
//! let id = store.insert(&event).await.unwrap();
//! let loaded = store.get(&id).await.unwrap();
//! # let _ = loaded;
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod store;

pub use config::{DocStoreAuth, DocStoreConfig, TlsConfig};
pub use store::DocStore;
