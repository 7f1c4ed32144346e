//! Subscription trie.
//!
//! Nodes live in an arena indexed by [`NodeId`]; the root is always slot 0
//! and represents "no key consumed yet". A node's terminals are exactly the
//! subscriptions whose path length equals the node's depth, kept in
//! registration order. Removal prunes every node left with neither children
//! nor terminals, so churn does not grow the arena without bound.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::key::{Path, PathKey};
use crate::subscription::{Subscriber, SubscriptionId};

/// Index of a node inside a [`SubscriptionTrie`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node.
    pub const ROOT: Self = Self(0);
}

#[derive(Debug, Default)]
struct Node {
    parent: Option<NodeId>,
    key: Option<PathKey>,
    depth: usize,
    children: HashMap<PathKey, NodeId>,
    terminals: Vec<SubscriptionId>,
}

impl Node {
    fn is_vacant(&self) -> bool {
        self.children.is_empty() && self.terminals.is_empty()
    }
}

/// A subscription owned by the trie.
pub struct Registered<T> {
    id: SubscriptionId,
    path: Path,
    node: NodeId,
    subscriber: Arc<dyn Subscriber<T>>,
    active: Arc<AtomicBool>,
}

impl<T> Registered<T> {
    /// The subscription handle.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The registered path.
    #[must_use]
    pub const fn path(&self) -> &Path {
        &self.path
    }

    /// The node the path terminates at.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// The callback.
    #[must_use]
    pub fn subscriber(&self) -> &Arc<dyn Subscriber<T>> {
        &self.subscriber
    }

    /// Flag cleared when the subscription is removed. Deliveries collected
    /// before the removal check it before running.
    pub(crate) fn active(&self) -> &Arc<AtomicBool> {
        &self.active
    }
}

impl<T> fmt::Debug for Registered<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registered")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("node", &self.node)
            .field("subscriber", &self.subscriber.name())
            .finish()
    }
}

/// Prefix tree of subscription paths.
pub struct SubscriptionTrie<T> {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    subscriptions: HashMap<SubscriptionId, Registered<T>>,
}

impl<T> SubscriptionTrie<T> {
    /// Creates a trie holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::default())],
            free: Vec::new(),
            subscriptions: HashMap::new(),
        }
    }

    /// Registers `subscriber` at the node named by `path`, creating nodes as
    /// needed.
    pub fn insert(&mut self, path: Path, subscriber: Arc<dyn Subscriber<T>>) -> SubscriptionId {
        let mut current = NodeId::ROOT;
        for key in &path {
            current = match self.child(current, key) {
                Some(next) => next,
                None => self.add_child(current, key.clone()),
            };
        }

        let id = SubscriptionId::new();
        self.node_mut(current).terminals.push(id);
        self.subscriptions.insert(
            id,
            Registered {
                id,
                path,
                node: current,
                subscriber,
                active: Arc::new(AtomicBool::new(true)),
            },
        );
        id
    }

    /// Removes a subscription and prunes the nodes it leaves empty.
    ///
    /// The subscription is marked inactive, so a publish that matched it
    /// before the removal skips it instead of delivering late.
    ///
    /// Returns `false` when `id` is unknown or already removed; the trie is
    /// left untouched in that case.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let Some(registered) = self.subscriptions.remove(&id) else {
            return false;
        };
        registered.active.store(false, Ordering::Release);

        let mut current = registered.node;
        self.node_mut(current).terminals.retain(|t| *t != id);

        while current != NodeId::ROOT && self.node(current).is_vacant() {
            let Some(node) = self.nodes[current.0].take() else {
                break;
            };
            self.free.push(current.0);
            let (Some(parent), Some(key)) = (node.parent, node.key) else {
                break;
            };
            self.node_mut(parent).children.remove(&key);
            current = parent;
        }

        true
    }

    /// The root node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Looks up the child of `node` reached through `key`.
    #[must_use]
    pub fn child(&self, node: NodeId, key: &PathKey) -> Option<NodeId> {
        self.nodes
            .get(node.0)
            .and_then(Option::as_ref)
            .and_then(|n| n.children.get(key).copied())
    }

    /// Returns true if `node` has a child for `key`.
    #[must_use]
    pub fn child_exists(&self, node: NodeId, key: &PathKey) -> bool {
        self.child(node, key).is_some()
    }

    /// Returns true if any subscription lives strictly below `node`.
    #[must_use]
    pub fn has_children(&self, node: NodeId) -> bool {
        self.nodes
            .get(node.0)
            .and_then(Option::as_ref)
            .is_some_and(|n| !n.children.is_empty())
    }

    /// Subscriptions terminating exactly at `node`, in registration order.
    pub fn terminals_at(&self, node: NodeId) -> impl Iterator<Item = &Registered<T>> + '_ {
        self.nodes
            .get(node.0)
            .and_then(Option::as_ref)
            .map(|n| n.terminals.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |id| self.subscriptions.get(id))
    }

    /// Depth of `node`, or `None` for a vacant slot.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> Option<usize> {
        self.nodes.get(node.0).and_then(Option::as_ref).map(|n| n.depth)
    }

    /// Looks up a registered subscription.
    #[must_use]
    pub fn get(&self, id: SubscriptionId) -> Option<&Registered<T>> {
        self.subscriptions.get(&id)
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Number of live nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    fn add_child(&mut self, parent: NodeId, key: PathKey) -> NodeId {
        let depth = self.node(parent).depth + 1;
        let node = Node {
            parent: Some(parent),
            key: Some(key.clone()),
            depth,
            ..Node::default()
        };
        let id = if let Some(slot) = self.free.pop() {
            self.nodes[slot] = Some(node);
            NodeId(slot)
        } else {
            self.nodes.push(Some(node));
            NodeId(self.nodes.len() - 1)
        };
        self.node_mut(parent).children.insert(key, id);
        id
    }

    // Only called with ids obtained from live nodes while `&mut self` is held.
    fn node(&self, id: NodeId) -> &Node {
        match self.nodes[id.0].as_ref() {
            Some(node) => node,
            None => unreachable!("trie node {} is vacant", id.0),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes[id.0].as_mut() {
            Some(node) => node,
            None => unreachable!("trie node {} is vacant", id.0),
        }
    }
}

impl<T> Default for SubscriptionTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SubscriptionTrie<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionTrie")
            .field("subscriptions", &self.subscriptions.len())
            .field("nodes", &self.node_count())
            .finish()
    }
}
