//! Per-event store routing.

use crate::event::AuditEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of the backend store/database instance an event is routed
/// to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreTarget(String);

impl StoreTarget {
    /// Creates a target from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the target name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoreTarget {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for StoreTarget {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Routing function evaluated against each event.
type RouteFn = dyn Fn(&AuditEvent) -> StoreTarget + Send + Sync;

/// Resolves the store target for each operation.
///
/// The routing function is evaluated fresh on every call, since routing may
/// depend on event content (a tenant field, for instance). Without a
/// routing function the resolver returns its default target. Routing
/// functions must be pure: no side effects, result determined by the event
/// alone.
#[derive(Clone)]
pub struct StoreResolver {
    default_target: StoreTarget,
    route: Option<Arc<RouteFn>>,
}

impl StoreResolver {
    /// Creates a resolver that always yields the given target.
    #[must_use]
    pub fn fixed(target: impl Into<StoreTarget>) -> Self {
        Self {
            default_target: target.into(),
            route: None,
        }
    }

    /// Creates a resolver with a per-event routing function.
    ///
    /// The default target is used by operations that have no event to
    /// route by (retrieval by identifier).
    #[must_use]
    pub fn routed(
        default_target: impl Into<StoreTarget>,
        route: impl Fn(&AuditEvent) -> StoreTarget + Send + Sync + 'static,
    ) -> Self {
        Self {
            default_target: default_target.into(),
            route: Some(Arc::new(route)),
        }
    }

    /// Resolves the target for an event.
    #[must_use]
    pub fn resolve(&self, event: &AuditEvent) -> StoreTarget {
        self.route
            .as_ref()
            .map_or_else(|| self.default_target.clone(), |route| route(event))
    }

    /// Returns the default target.
    #[must_use]
    pub const fn default_target(&self) -> &StoreTarget {
        &self.default_target
    }
}

impl Default for StoreResolver {
    fn default() -> Self {
        Self::fixed("events")
    }
}

impl fmt::Debug for StoreResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreResolver")
            .field("default_target", &self.default_target)
            .field("route", &self.route.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
