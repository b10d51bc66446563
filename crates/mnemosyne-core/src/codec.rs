//! Canonical JSON encoding for audit events.
//!
//! Every store persists the same canonical byte form: object keys in
//! lexicographic order, compact separators, and null-valued fields dropped
//! under the default policy. Bytes produced by a backend's native writer
//! are brought into canonical form with [`JsonCodec::normalize`], so stored
//! documents stay byte-comparable across backends.

use crate::event::AuditEvent;
use serde_json::Value;

/// How null-valued fields are treated when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullValuePolicy {
    /// Drop null-valued object members, recursively.
    #[default]
    Omit,
    /// Keep null-valued object members as-is.
    Preserve,
}

/// Errors that can occur while encoding or decoding events.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The event could not be encoded.
    #[error("Failed to encode event: {source}")]
    Encode {
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// The bytes could not be decoded into an event.
    #[error("Failed to decode event: {source}")]
    Decode {
        /// Underlying deserializer error.
        #[source]
        source: serde_json::Error,
    },

    /// The encoded form is not a JSON object.
    #[error("Encoded event is not a JSON object")]
    NotAnObject,
}

/// The transport/storage encoding of an audit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedForm(Vec<u8>);

impl SerializedForm {
    /// Returns the encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the form, returning the encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the encoded form as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Returns the encoded length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the encoded form is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Canonical JSON codec for audit events.
///
/// Selected once when a store is constructed and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    null_values: NullValuePolicy,
}

impl JsonCodec {
    /// Creates a codec with the default (null-omitting) policy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            null_values: NullValuePolicy::Omit,
        }
    }

    /// Sets the null-value policy.
    #[must_use]
    pub const fn with_null_values(mut self, policy: NullValuePolicy) -> Self {
        self.null_values = policy;
        self
    }

    /// Returns the active null-value policy.
    #[must_use]
    pub const fn null_values(&self) -> NullValuePolicy {
        self.null_values
    }

    /// Encodes an event into its canonical byte form.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be represented as a JSON
    /// object.
    pub fn encode(&self, event: &AuditEvent) -> Result<SerializedForm, CodecError> {
        let mut value =
            serde_json::to_value(event).map_err(|source| CodecError::Encode { source })?;
        if !value.is_object() {
            return Err(CodecError::NotAnObject);
        }
        if self.null_values == NullValuePolicy::Omit {
            strip_null_members(&mut value);
        }
        serde_json::to_vec(&value)
            .map(SerializedForm)
            .map_err(|source| CodecError::Encode { source })
    }

    /// Decodes an event from its encoded form.
    ///
    /// Unknown members are collected into the event's open field map, so a
    /// decode of a canonical encoding reproduces every non-null field known
    /// at encoding time.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid encoded event.
    pub fn decode(&self, bytes: &[u8]) -> Result<AuditEvent, CodecError> {
        serde_json::from_slice(bytes).map_err(|source| CodecError::Decode { source })
    }

    /// Re-encodes foreign bytes into canonical form.
    ///
    /// Used when a backend's native writer produced the bytes: the result
    /// is byte-identical to what [`JsonCodec::encode`] would have produced
    /// for the same logical document. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid JSON.
    pub fn normalize(&self, bytes: &[u8]) -> Result<SerializedForm, CodecError> {
        let mut value: Value =
            serde_json::from_slice(bytes).map_err(|source| CodecError::Decode { source })?;
        if self.null_values == NullValuePolicy::Omit {
            strip_null_members(&mut value);
        }
        serde_json::to_vec(&value)
            .map(SerializedForm)
            .map_err(|source| CodecError::Encode { source })
    }
}

/// Removes null-valued object members, recursing through objects and
/// arrays. Null array elements are positional values, not fields, and are
/// kept.
fn strip_null_members(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for v in map.values_mut() {
                strip_null_members(v);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                strip_null_members(item);
            }
        }
        _ => {}
    }
}
