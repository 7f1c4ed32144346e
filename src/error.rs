//! Error types for pathsub.
//!
//! Registration failures are returned eagerly from `subscribe`. Failures that
//! happen while a value is being routed never abort the publish call; they are
//! collected per branch into a [`crate::PublishReport`].

use thiserror::Error;

use crate::subscription::SubscriptionId;

/// Errors raised when a subscription path is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Subscription path cannot be empty")]
    EmptyPath,

    #[error("Subscription path has {depth} keys, maximum is {max_depth}")]
    PathTooDeep {
        depth: usize,
        max_depth: usize,
    },
}

/// Errors isolated to a single branch or subscriber during a publish.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraversalError {
    #[error("Traverser stage '{stage}' panicked at depth {depth}: {message}")]
    TraverserPanicked {
        stage: String,
        depth: usize,
        message: String,
    },

    #[error("Traverser stage '{stage}' failed at depth {depth}: {reason}")]
    TraverserFailed {
        stage: String,
        depth: usize,
        reason: String,
    },

    #[error("Traverser stage '{stage}' continued into stage #{next} which was not defined before it")]
    BackwardEdge {
        stage: String,
        next: usize,
    },

    #[error("Traversal started at stage #{stage} but the graph has {stages} stages")]
    UnknownStage {
        stage: usize,
        stages: usize,
    },

    #[error("Subscriber {subscription} ('{name}') panicked: {message}")]
    SubscriberPanicked {
        subscription: SubscriptionId,
        name: String,
        message: String,
    },
}

/// Top-level error type for pathsub.
#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Traversal error: {0}")]
    Traversal(#[from] TraversalError),

    #[error("Subscription stream {subscription} is closed")]
    StreamClosed {
        subscription: SubscriptionId,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl PubSubError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a registration error.
    #[must_use]
    pub const fn is_registration(&self) -> bool {
        matches!(self, Self::Registration(_))
    }

    /// Returns true if this is a traversal error.
    #[must_use]
    pub const fn is_traversal(&self) -> bool {
        matches!(self, Self::Traversal(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for pathsub operations.
pub type PubSubResult<T> = Result<T, PubSubError>;

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
