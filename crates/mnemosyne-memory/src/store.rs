//! In-memory store implementation.

use async_trait::async_trait;
use mnemosyne_core::{
    AuditEvent, AuditStore, EventId, EventQuery, JsonCodec, ReplacePolicy, Result,
    SerializedForm, StoreError, StoreResolver, StoreTarget,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// In-memory audit store.
///
/// Records live per target in maps behind a read-write lock; targets
/// materialize lazily on first write. The lock guard is the scoped session
/// for each operation and is released on every exit path.
#[derive(Debug)]
pub struct MemoryStore {
    codec: JsonCodec,
    resolver: StoreResolver,
    replace_policy: ReplacePolicy,
    targets: RwLock<HashMap<StoreTarget, HashMap<EventId, SerializedForm>>>,
    next_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store with the default codec and resolver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            codec: JsonCodec::new(),
            resolver: StoreResolver::default(),
            replace_policy: ReplacePolicy::RequireExisting,
            targets: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Sets the codec.
    #[must_use]
    pub fn with_codec(mut self, codec: JsonCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the store resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: StoreResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets the replace policy. The default requires pre-existence.
    #[must_use]
    pub const fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.replace_policy = policy;
        self
    }

    /// Returns the number of records held for a target.
    #[must_use]
    pub fn len(&self, target: &StoreTarget) -> usize {
        self.targets.read().get(target).map_or(0, HashMap::len)
    }

    /// Returns whether a target holds no records.
    #[must_use]
    pub fn is_empty(&self, target: &StoreTarget) -> bool {
        self.len(target) == 0
    }

    /// Returns the targets that have received at least one write.
    #[must_use]
    pub fn targets(&self) -> Vec<StoreTarget> {
        self.targets.read().keys().cloned().collect()
    }

    /// Queries a target's records with a filter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if a stored record cannot be
    /// decoded.
    pub fn query(&self, target: &StoreTarget, query: &EventQuery) -> Result<Vec<AuditEvent>> {
        let targets = self.targets.read();
        let Some(records) = targets.get(target) else {
            return Ok(Vec::new());
        };

        let mut matched = Vec::new();
        for encoded in records.values() {
            let event = self.codec.decode(encoded.as_bytes())?;
            if query.matches(&event) {
                matched.push(event);
            }
        }
        matched.sort_by_key(|event| event.occurred_at);
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn assign_id(&self) -> EventId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        EventId::new(format!("events/{n}-A"))
    }

    fn read_record(&self, target: &StoreTarget, id: &EventId) -> Result<AuditEvent> {
        let targets = self.targets.read();
        let encoded = targets
            .get(target)
            .and_then(|records| records.get(id))
            .ok_or_else(|| StoreError::NotFound {
                target: target.clone(),
                id: id.clone(),
            })?;
        self.codec.decode(encoded.as_bytes()).map_err(StoreError::from)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    fn codec(&self) -> &JsonCodec {
        &self.codec
    }

    async fn insert(&self, event: &AuditEvent) -> Result<EventId> {
        let encoded = self.codec.encode(event)?;
        let target = self.resolver.resolve(event);
        let id = self.assign_id();

        let mut targets = self.targets.write();
        targets
            .entry(target.clone())
            .or_default()
            .insert(id.clone(), encoded);
        drop(targets);

        debug!(%target, %id, kind = %event.kind, "Inserted event");
        Ok(id)
    }

    async fn replace(&self, id: &EventId, event: &AuditEvent) -> Result<()> {
        let encoded = self.codec.encode(event)?;
        let target = self.resolver.resolve(event);

        let mut targets = self.targets.write();
        let records = targets.entry(target.clone()).or_default();
        if self.replace_policy == ReplacePolicy::RequireExisting && !records.contains_key(id) {
            return Err(StoreError::NotFound {
                target,
                id: id.clone(),
            });
        }
        records.insert(id.clone(), encoded);
        drop(targets);

        debug!(%target, %id, "Replaced event");
        Ok(())
    }

    async fn get(&self, id: &EventId) -> Result<AuditEvent> {
        self.read_record(self.resolver.default_target(), id)
    }

    async fn get_from(&self, target: &StoreTarget, id: &EventId) -> Result<AuditEvent> {
        self.read_record(target, id)
    }
}
