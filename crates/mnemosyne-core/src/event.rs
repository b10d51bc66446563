//! Audit event definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current event envelope schema version.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

/// A structured record describing one occurrence of interest.
///
/// An event is a small envelope (kind, timestamp, actor, correlation ID)
/// plus an open field map carrying the caller's domain data. The field map
/// is flattened on the wire, so the persisted form is a single flat JSON
/// document.
///
/// An event carries no identity of its own: identifiers are assigned by
/// the store that persists it and live outside the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event type discriminator (e.g. `"Connect"`, `"order.shipped"`).
    pub kind: String,

    /// When the recorded activity happened.
    pub occurred_at: DateTime<Utc>,

    /// Who triggered the activity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// Correlation ID for request tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Capture-context metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EventMetadata>,

    /// Caller-extended domain fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AuditEvent {
    /// Creates a new event of the given kind, timestamped now.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            occurred_at: Utc::now(),
            actor: None,
            correlation_id: None,
            metadata: None,
            fields: Map::new(),
        }
    }

    /// Sets the occurrence timestamp.
    #[must_use]
    pub const fn with_occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = at;
        self
    }

    /// Sets the actor.
    #[must_use]
    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    /// Sets the correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: &str) -> Self {
        self.correlation_id = Some(id.to_string());
        self
    }

    /// Attaches capture-context metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Adds a domain field.
    ///
    /// A field whose value is `null` is kept in memory but dropped by the
    /// codec's default null policy when the event is encoded. Field names
    /// must not collide with envelope keys (`kind`, `occurred_at`,
    /// `actor`, `correlation_id`, `metadata`): the wire form is flat.
    #[must_use]
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Returns a domain field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns a domain field as a string slice, if it is one.
    #[must_use]
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Metadata describing the context an event was captured in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Schema version for the event envelope.
    pub schema_version: String,

    /// Event source identifier.
    pub source: String,

    /// Environment (production, staging, development).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Hostname where the event was captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Process ID of the capturing process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Additional custom tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            source: "mnemosyne".to_string(),
            environment: None,
            hostname: None,
            pid: None,
            tags: Vec::new(),
        }
    }
}

impl EventMetadata {
    /// Creates metadata with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates metadata with source identification.
    #[must_use]
    pub fn with_source(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, env: &str) -> Self {
        self.environment = Some(env.to_string());
        self
    }

    /// Sets the hostname.
    #[must_use]
    pub fn hostname(mut self, hostname: &str) -> Self {
        self.hostname = Some(hostname.to_string());
        self
    }

    /// Sets the process ID.
    #[must_use]
    pub const fn pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }
}
