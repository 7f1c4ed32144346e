use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryIter, TrySendError};

use crate::error::{PubSubError, PubSubResult};
use crate::subscription::{Subscriber, SubscriptionId};
use crate::trie::SubscriptionTrie;

/// Subscriber that forwards clones of matched values into a bounded channel.
///
/// Never blocks the publisher: when the buffer is full the value is dropped
/// and counted.
pub(crate) struct ChannelSink<T> {
    name: String,
    tx: Sender<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> ChannelSink<T> {
    pub(crate) fn new(name: String, tx: Sender<T>, dropped: Arc<AtomicU64>) -> Self {
        Self { name, tx, dropped }
    }
}

impl<T: Clone + Send> Subscriber<T> for ChannelSink<T> {
    fn deliver(&self, value: &T) {
        match self.tx.try_send(value.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(name = %self.name, "channel subscriber dropped a value");
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Receiving end of a channel subscription.
///
/// Dropping the stream unsubscribes it.
pub struct SubscriptionStream<T> {
    subscription_id: SubscriptionId,
    rx: Receiver<T>,
    dropped: Arc<AtomicU64>,
    registry: Weak<RwLock<SubscriptionTrie<T>>>,
    unregistered: AtomicBool,
}

impl<T> SubscriptionStream<T> {
    pub(crate) fn new(
        subscription_id: SubscriptionId,
        rx: Receiver<T>,
        dropped: Arc<AtomicU64>,
        registry: Weak<RwLock<SubscriptionTrie<T>>>,
    ) -> Self {
        Self {
            subscription_id,
            rx,
            dropped,
            registry,
            unregistered: AtomicBool::new(false),
        }
    }

    /// The subscription id backing this stream.
    #[must_use]
    pub const fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Values discarded because the buffer was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Removes the subscription from its router.
    ///
    /// Idempotent. Values already buffered can still be received; afterwards
    /// the stream reports [`PubSubError::StreamClosed`].
    pub fn unsubscribe(&self) {
        if self.unregistered.swap(true, Ordering::AcqRel) {
            return;
        }

        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let removed = match registry.write() {
            Ok(mut trie) => trie.remove(self.subscription_id),
            Err(_) => {
                tracing::warn!(
                    subscription = %self.subscription_id,
                    "poisoned lock: stream.unsubscribe, subscription left registered"
                );
                false
            }
        };
        if removed {
            tracing::debug!(subscription = %self.subscription_id, "stream unsubscribed");
        }
    }

    /// Receive the next value (blocking).
    pub fn recv(&self) -> PubSubResult<T> {
        self.rx.recv().map_err(|_| PubSubError::StreamClosed {
            subscription: self.subscription_id,
        })
    }

    /// Receive the next value with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> PubSubResult<T> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => PubSubError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            RecvTimeoutError::Disconnected => PubSubError::StreamClosed {
                subscription: self.subscription_id,
            },
        })
    }

    /// Receive a buffered value without blocking.
    #[must_use]
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drains every buffered value without blocking.
    pub fn try_iter(&self) -> TryIter<'_, T> {
        self.rx.try_iter()
    }
}

impl<T> std::fmt::Debug for SubscriptionStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionStream")
            .field("subscription_id", &self.subscription_id)
            .field("buffered", &self.rx.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl<T> Drop for SubscriptionStream<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
