//! Subscription identity and the subscriber callback trait.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle returned by `subscribe` and used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Receives every published value whose traversal reaches the subscription's
/// path.
///
/// Subscribers run inline on the publishing thread and always see the whole
/// value; the path only filters. Slow work should be handed off elsewhere,
/// e.g. through `Router::subscribe_channel`.
///
/// # Example
///
/// ```rust,ignore
/// struct Audit;
///
/// impl Subscriber<Order> for Audit {
///     fn deliver(&self, order: &Order) {
///         tracing::info!(id = order.id, "order routed");
///     }
///
///     fn name(&self) -> &str {
///         "audit"
///     }
/// }
/// ```
pub trait Subscriber<T>: Send + Sync {
    /// Called once per matching publish.
    fn deliver(&self, value: &T);

    /// Name used in logs and error reports.
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Adapter that wraps a closure into a [`Subscriber`].
pub struct FnSubscriber<F> {
    name: String,
    f: F,
}

impl<F> FnSubscriber<F> {
    /// Wraps `f` under the given name.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<T, F> Subscriber<T> for FnSubscriber<F>
where
    F: Fn(&T) + Send + Sync,
{
    fn deliver(&self, value: &T) {
        (self.f)(value);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnSubscriber<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSubscriber").field("name", &self.name).finish_non_exhaustive()
    }
}
