//! The audit store contract.

use crate::codec::{JsonCodec, SerializedForm};
use crate::error::{Result, StoreError};
use crate::event::AuditEvent;
use crate::resolver::StoreTarget;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier assigned by a store when an event is inserted.
///
/// The format is backend-defined; the bundled providers assign
/// `events/{n}-{node}` style identifiers (e.g. `events/1-A`). Callers
/// treat the value as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates an identifier from its backend representation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How `replace` treats identifiers with no existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacePolicy {
    /// Write the record whether or not the identifier exists.
    Upsert,
    /// Fail with `NotFound` when the identifier has no record.
    RequireExisting,
}

/// Storage backend abstraction for audit events.
///
/// Implementations persist events durably and hand back an opaque
/// identifier per insert. Each operation resolves its target, acquires a
/// scoped session or guard for it, performs exactly one durable read or
/// write, and releases the session on every exit path. Concurrent
/// operations are independent; the only state shared between them is the
/// codec and the resolver, both read-only after construction.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Returns the codec this store encodes events with.
    fn codec(&self) -> &JsonCodec;

    /// Durably persists a new event and returns its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend cannot be
    /// reached and [`StoreError::Serialization`] if the event cannot be
    /// encoded.
    async fn insert(&self, event: &AuditEvent) -> Result<EventId>;

    /// Writes new content under an existing identifier.
    ///
    /// Whether a missing identifier upserts or fails is governed by the
    /// provider's [`ReplacePolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] under
    /// [`ReplacePolicy::RequireExisting`] when the identifier has no
    /// record.
    async fn replace(&self, id: &EventId, event: &AuditEvent) -> Result<()>;

    /// Retrieves an event from the default target by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the identifier does not
    /// resolve to a record.
    async fn get(&self, id: &EventId) -> Result<AuditEvent>;

    /// Retrieves an event from an explicit target by identifier.
    ///
    /// Retrieval has no event to run the routing function on, so callers
    /// reading from a routed target name it here.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the identifier does not
    /// resolve to a record in that target.
    async fn get_from(&self, target: &StoreTarget, id: &EventId) -> Result<AuditEvent>;

    /// Encodes an event exactly as this store would persist it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if the event cannot be
    /// encoded.
    fn serialize(&self, event: &AuditEvent) -> Result<SerializedForm> {
        self.codec().encode(event).map_err(StoreError::from)
    }
}

/// Blocking facade over an async store.
///
/// Owns a current-thread runtime and drives each operation to completion
/// on the caller's thread. Side effects and errors are identical to the
/// async contract; only the way the caller waits differs.
///
/// Must not be used from inside an async runtime; callers already on a
/// runtime use the async contract directly.
#[derive(Debug)]
pub struct BlockingStore<S> {
    inner: S,
    runtime: tokio::runtime::Runtime,
}

impl<S: AuditStore> BlockingStore<S> {
    /// Wraps an async store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the runtime cannot be built.
    pub fn new(inner: S) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Config {
                message: format!("failed to build blocking runtime: {e}"),
            })?;
        Ok(Self { inner, runtime })
    }

    /// Durably persists a new event and returns its assigned identifier.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`AuditStore::insert`].
    pub fn insert(&self, event: &AuditEvent) -> Result<EventId> {
        self.runtime.block_on(self.inner.insert(event))
    }

    /// Writes new content under an existing identifier.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`AuditStore::replace`].
    pub fn replace(&self, id: &EventId, event: &AuditEvent) -> Result<()> {
        self.runtime.block_on(self.inner.replace(id, event))
    }

    /// Retrieves an event from the default target by identifier.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`AuditStore::get`].
    pub fn get(&self, id: &EventId) -> Result<AuditEvent> {
        self.runtime.block_on(self.inner.get(id))
    }

    /// Retrieves an event from an explicit target by identifier.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`AuditStore::get_from`].
    pub fn get_from(&self, target: &StoreTarget, id: &EventId) -> Result<AuditEvent> {
        self.runtime.block_on(self.inner.get_from(target, id))
    }

    /// Encodes an event exactly as the wrapped store would persist it.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`AuditStore::serialize`].
    pub fn serialize(&self, event: &AuditEvent) -> Result<SerializedForm> {
        self.inner.serialize(event)
    }

    /// Returns the wrapped store.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Consumes the wrapper, returning the wrapped store.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Minimal single-target store for exercising the contract machinery.
    #[derive(Debug, Default)]
    struct ScratchStore {
        codec: JsonCodec,
        records: Mutex<HashMap<EventId, SerializedForm>>,
        next: Mutex<u64>,
    }

    #[async_trait]
    impl AuditStore for ScratchStore {
        fn codec(&self) -> &JsonCodec {
            &self.codec
        }

        async fn insert(&self, event: &AuditEvent) -> Result<EventId> {
            let encoded = self.codec.encode(event)?;
            let mut next = self.next.lock().unwrap();
            *next += 1;
            let id = EventId::new(format!("events/{next}-A", next = *next));
            self.records.lock().unwrap().insert(id.clone(), encoded);
            Ok(id)
        }

        async fn replace(&self, id: &EventId, event: &AuditEvent) -> Result<()> {
            let encoded = self.codec.encode(event)?;
            self.records.lock().unwrap().insert(id.clone(), encoded);
            Ok(())
        }

        async fn get(&self, id: &EventId) -> Result<AuditEvent> {
            let records = self.records.lock().unwrap();
            let encoded = records.get(id).ok_or_else(|| StoreError::NotFound {
                target: StoreTarget::new("events"),
                id: id.clone(),
            })?;
            self.codec.decode(encoded.as_bytes()).map_err(StoreError::from)
        }

        async fn get_from(&self, _target: &StoreTarget, id: &EventId) -> Result<AuditEvent> {
            self.get(id).await
        }
    }

    #[test]
    fn test_event_id_roundtrip() {
        let id = EventId::new("events/1-A");
        assert_eq!(id.as_str(), "events/1-A");
        assert_eq!(id.to_string(), "events/1-A");
        assert_eq!(EventId::from("events/1-A"), id);
    }

    #[test]
    fn test_blocking_store_insert_get() {
        let store = BlockingStore::new(ScratchStore::default()).unwrap();

        let event = AuditEvent::new("Connect").with_field("ConnectionId", "abc123");
        let id = store.insert(&event).unwrap();
        assert_eq!(id.as_str(), "events/1-A");

        let loaded = store.get(&id).unwrap();
        assert_eq!(loaded.field_str("ConnectionId"), Some("abc123"));
    }

    #[test]
    fn test_blocking_store_replace() {
        let store = BlockingStore::new(ScratchStore::default()).unwrap();

        let id = store.insert(&AuditEvent::new("Connect")).unwrap();
        store
            .replace(&id, &AuditEvent::new("Disconnect"))
            .unwrap();

        assert_eq!(store.get(&id).unwrap().kind, "Disconnect");
    }

    #[test]
    fn test_blocking_store_not_found() {
        let store = BlockingStore::new(ScratchStore::default()).unwrap();
        let err = store.get(&EventId::new("events/99-A")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_default_serialize_uses_codec() {
        let store = ScratchStore::default();
        let event = AuditEvent::new("Connect").with_field("Detail", serde_json::Value::Null);

        let form = store.serialize(&event).unwrap();
        assert!(!form.as_str().unwrap().contains("Detail"));
    }
}
