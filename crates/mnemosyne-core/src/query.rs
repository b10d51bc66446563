//! Filters for querying stored events.

use crate::event::AuditEvent;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Filter for querying persisted audit events.
///
/// Empty filters match everything. Providers that support querying expose
/// an inherent `query` method taking this filter; querying is not part of
/// the [`AuditStore`](crate::AuditStore) contract.
#[derive(Debug, Default, Clone)]
pub struct EventQuery {
    /// Filter by event kind.
    pub kind: Option<String>,

    /// Filter by actor.
    pub actor: Option<String>,

    /// Filter by correlation ID.
    pub correlation_id: Option<String>,

    /// Filter by occurrence time, inclusive lower bound.
    pub from: Option<DateTime<Utc>>,

    /// Filter by occurrence time, inclusive upper bound.
    pub to: Option<DateTime<Utc>>,

    /// Filter by an exact domain field value.
    pub field: Option<(String, Value)>,

    /// Maximum results to return.
    pub limit: Option<usize>,
}

impl EventQuery {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by event kind.
    #[must_use]
    pub fn kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    /// Filters by actor.
    #[must_use]
    pub fn actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    /// Filters by correlation ID.
    #[must_use]
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.correlation_id = Some(id.to_string());
        self
    }

    /// Filters by occurrence time range (inclusive on both ends).
    #[must_use]
    pub const fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Filters by an exact domain field value.
    #[must_use]
    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.field = Some((name.to_string(), value.into()));
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks whether an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(ref kind) = self.kind {
            if event.kind != *kind {
                return false;
            }
        }
        if let Some(ref actor) = self.actor {
            if event.actor.as_deref() != Some(actor.as_str()) {
                return false;
            }
        }
        if let Some(ref id) = self.correlation_id {
            if event.correlation_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if event.occurred_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if event.occurred_at > to {
                return false;
            }
        }
        if let Some((ref name, ref value)) = self.field {
            if event.field(name) != Some(value) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> AuditEvent {
        AuditEvent::new("Connect")
            .with_actor("hub")
            .with_correlation_id("req-1")
            .with_field("Tenant", "north")
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(EventQuery::new().matches(&sample()));
    }

    #[test]
    fn test_kind_filter() {
        assert!(EventQuery::new().kind("Connect").matches(&sample()));
        assert!(!EventQuery::new().kind("Disconnect").matches(&sample()));
    }

    #[test]
    fn test_actor_filter() {
        assert!(EventQuery::new().actor("hub").matches(&sample()));
        assert!(!EventQuery::new().actor("other").matches(&sample()));
    }

    #[test]
    fn test_field_filter() {
        assert!(EventQuery::new().field("Tenant", "north").matches(&sample()));
        assert!(!EventQuery::new().field("Tenant", "south").matches(&sample()));
        assert!(!EventQuery::new().field("Missing", 1).matches(&sample()));
    }

    #[test]
    fn test_time_range_filter() {
        let event = sample();
        let before = event.occurred_at - Duration::seconds(10);
        let after = event.occurred_at + Duration::seconds(10);

        assert!(EventQuery::new().between(before, after).matches(&event));
        assert!(!EventQuery::new().between(after, after).matches(&event));
    }

    #[test]
    fn test_combined_filter() {
        let query = EventQuery::new()
            .kind("Connect")
            .actor("hub")
            .field("Tenant", "north");
        assert!(query.matches(&sample()));

        let query = query.correlation_id("req-2");
        assert!(!query.matches(&sample()));
    }
}
