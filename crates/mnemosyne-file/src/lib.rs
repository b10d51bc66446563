//! # Mnemosyne File
//!
//! Append-only JSONL audit store: one journal per target, rotated by size
//! with count- and age-based retention, and hex SHA-256 checksums on every
//! record so tampering surfaces on read.
//!
//! Replace appends a new record under the same identifier; the most recent
//! record for an identifier wins on read, including records in rotated
//! journals.
//!
//! ## Example
//!
//! ```no_run
//! use mnemosyne_core::{AuditEvent, AuditStore};
//! use mnemosyne_file::{FileStore, FileStoreConfig};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = FileStore::new(FileStoreConfig::new("/var/lib/myapp/audit")).unwrap();
//!
//! let event = AuditEvent::new("order.shipped").with_field("OrderId", "o-17");
//! let id = store.insert(&event).await.unwrap();
//! assert!(store.get(&id).await.is_ok());
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod store;

pub use config::FileStoreConfig;
pub use store::FileStore;
