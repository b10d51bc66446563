//! Error types shared by every store implementation.

use crate::codec::CodecError;
use crate::resolver::StoreTarget;
use crate::store::EventId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`StoreError`] as the error type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// Backend failures are surfaced unchanged: this layer adds no retries, no
/// suppression and no fallback behavior.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend for a target could not be reached, or timed out.
    #[error("Store target '{target}' is unavailable: {message}")]
    Unavailable {
        /// Target the operation was routed to.
        target: StoreTarget,
        /// Description of the backend failure.
        message: String,
    },

    /// No record exists under the identifier.
    #[error("Event '{id}' not found in store target '{target}'")]
    NotFound {
        /// Target the lookup was routed to.
        target: StoreTarget,
        /// Identifier that did not resolve.
        id: EventId,
    },

    /// The event could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] CodecError),

    /// File I/O failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A stored record failed its integrity check.
    #[error("Stored record '{id}' is corrupted: {reason}")]
    Corrupted {
        /// Identifier of the corrupted record.
        id: EventId,
        /// What the integrity check found.
        reason: String,
    },

    /// Invalid construction-time configuration.
    #[error("Invalid store configuration: {message}")]
    Config {
        /// What is wrong with the configuration.
        message: String,
    },
}

impl StoreError {
    /// Returns whether this is a not-found failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns whether this is an availability failure.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = StoreError::NotFound {
            target: StoreTarget::new("north"),
            id: EventId::new("events/7-A"),
        };
        assert_eq!(
            err.to_string(),
            "Event 'events/7-A' not found in store target 'north'"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display_unavailable() {
        let err = StoreError::Unavailable {
            target: StoreTarget::new("events"),
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("unavailable"));
        assert!(err.is_unavailable());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_codec_error_converts() {
        let codec_err = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let err = StoreError::from(CodecError::Decode { source: codec_err });
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
