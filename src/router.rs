//! Registry facade.
//!
//! [`Router`] owns the subscription trie behind a reader-writer lock.
//! Publishes only read the trie and proceed in parallel; subscribe and
//! unsubscribe take the write lock. Subscribers run after the read guard is
//! released, on the publishing thread, before `publish` returns. A
//! subscription removed in the meantime is skipped, so once `unsubscribe`
//! returns no later delivery to it starts.

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crossbeam_channel::bounded;

use crate::config::RouterConfig;
use crate::engine::{self, FanOut, PublishReport};
use crate::error::{PubSubError, PubSubResult, RegistrationError};
use crate::key::Path;
use crate::stream::{ChannelSink, SubscriptionStream};
use crate::subscription::{FnSubscriber, Subscriber, SubscriptionId};
use crate::traverse::{StageId, TraversalGraph};
use crate::trie::SubscriptionTrie;

fn lock_err(context: &'static str) -> PubSubError {
    PubSubError::internal(format!("poisoned lock: {context}"))
}

/// Publish/subscribe router over structural paths.
///
/// Cloning is cheap and yields a handle to the same registry.
pub struct Router<T> {
    cfg: RouterConfig,
    trie: Arc<RwLock<SubscriptionTrie<T>>>,
}

impl<T> Router<T> {
    /// Creates a router with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Creates a router with the given configuration.
    #[must_use]
    pub fn with_config(cfg: RouterConfig) -> Self {
        Self {
            cfg,
            trie: Arc::new(RwLock::new(SubscriptionTrie::new())),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.cfg
    }

    /// Registers `subscriber` for values whose traversal produces `path`.
    pub fn subscribe<S>(&self, path: Path, subscriber: S) -> PubSubResult<SubscriptionId>
    where
        S: Subscriber<T> + 'static,
    {
        self.subscribe_arc(path, Arc::new(subscriber))
    }

    /// Registers a closure; it is named after its path in logs.
    pub fn subscribe_fn<F>(&self, path: Path, f: F) -> PubSubResult<SubscriptionId>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let name = format!("fn{path}");
        self.subscribe(path, FnSubscriber::new(name, f))
    }

    /// Registers a shared subscriber.
    pub fn subscribe_arc(
        &self,
        path: Path,
        subscriber: Arc<dyn Subscriber<T>>,
    ) -> PubSubResult<SubscriptionId> {
        self.check_path(&path)?;

        let mut trie = self.write("router.subscribe")?;
        let name = subscriber.name().to_string();
        let shown = path.to_string();
        let id = trie.insert(path, subscriber);
        tracing::debug!(subscription = %id, %name, path = %shown, "subscribed");
        Ok(id)
    }

    /// Removes a subscription.
    ///
    /// Returns `Ok(false)` when `id` is unknown or was already removed; that
    /// case leaves the registry untouched.
    pub fn unsubscribe(&self, id: SubscriptionId) -> PubSubResult<bool> {
        let removed = self.write("router.unsubscribe")?.remove(id);
        if removed {
            tracing::debug!(subscription = %id, "unsubscribed");
        } else {
            tracing::debug!(subscription = %id, "unsubscribe of unknown subscription ignored");
        }
        Ok(removed)
    }

    /// Routes `value` through `graph` from its root stage and runs every
    /// matched subscriber.
    ///
    /// Branch and subscriber failures are collected in the report; the only
    /// error returned is a poisoned registry lock.
    pub fn publish(&self, value: &T, graph: &TraversalGraph<T>) -> PubSubResult<PublishReport> {
        match graph.root() {
            Some(root) => self.publish_from(value, graph, root),
            None => Ok(PublishReport::default()),
        }
    }

    /// Like [`Router::publish`], entering the graph at `stage`.
    pub fn publish_from(
        &self,
        value: &T,
        graph: &TraversalGraph<T>,
        stage: StageId,
    ) -> PubSubResult<PublishReport> {
        let isolate = self.cfg.isolate_panics;
        let FanOut {
            deliveries,
            mut report,
        } = {
            let trie = self.read("router.publish")?;
            engine::route(&*trie, graph, stage, value, isolate)
        };

        engine::dispatch(deliveries, value, isolate, &mut report);
        tracing::trace!(
            delivered = report.delivered,
            traverser_calls = report.traverser_calls,
            pruned = report.pruned,
            errors = report.errors.len(),
            "published"
        );
        Ok(report)
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> PubSubResult<usize> {
        Ok(self.read("router.len")?.len())
    }

    /// Returns true if nothing is subscribed.
    pub fn is_empty(&self) -> PubSubResult<bool> {
        Ok(self.read("router.is_empty")?.is_empty())
    }

    /// Number of live trie nodes, root included.
    pub fn node_count(&self) -> PubSubResult<usize> {
        Ok(self.read("router.node_count")?.node_count())
    }

    /// Returns true if `id` is still subscribed.
    pub fn contains(&self, id: SubscriptionId) -> PubSubResult<bool> {
        Ok(self.read("router.contains")?.get(id).is_some())
    }

    /// The path `id` was registered with.
    pub fn path_of(&self, id: SubscriptionId) -> PubSubResult<Option<Path>> {
        Ok(self.read("router.path_of")?.get(id).map(|r| r.path().clone()))
    }

    fn check_path(&self, path: &Path) -> Result<(), RegistrationError> {
        if path.len() > self.cfg.max_path_depth {
            return Err(RegistrationError::PathTooDeep {
                depth: path.len(),
                max_depth: self.cfg.max_path_depth,
            });
        }
        Ok(())
    }

    fn read(&self, context: &'static str) -> PubSubResult<RwLockReadGuard<'_, SubscriptionTrie<T>>> {
        self.trie.read().map_err(|_| lock_err(context))
    }

    fn write(&self, context: &'static str) -> PubSubResult<RwLockWriteGuard<'_, SubscriptionTrie<T>>> {
        self.trie.write().map_err(|_| lock_err(context))
    }
}

impl<T: Clone + Send + 'static> Router<T> {
    /// Subscribes a bounded channel using the configured stream capacity.
    pub fn subscribe_channel(&self, path: Path) -> PubSubResult<SubscriptionStream<T>> {
        self.subscribe_channel_with_capacity(path, self.cfg.stream_capacity)
    }

    /// Subscribes a bounded channel holding at most `capacity` values.
    ///
    /// Matched values are cloned into the channel; when it is full they are
    /// dropped and counted rather than blocking the publisher.
    pub fn subscribe_channel_with_capacity(
        &self,
        path: Path,
        capacity: usize,
    ) -> PubSubResult<SubscriptionStream<T>> {
        let (tx, rx) = bounded(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let sink = ChannelSink::new(format!("channel{path}"), tx, Arc::clone(&dropped));
        let id = self.subscribe(path, sink)?;
        Ok(SubscriptionStream::new(id, rx, dropped, Arc::downgrade(&self.trie)))
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Router<T> {
    fn clone(&self) -> Self {
        Self {
            cfg: self.cfg.clone(),
            trie: Arc::clone(&self.trie),
        }
    }
}

impl<T> std::fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("cfg", &self.cfg).finish_non_exhaustive()
    }
}
