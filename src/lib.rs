//! # pathsub - publish/subscribe over lazily traversed structural paths
//!
//! Subscribers register a [`Path`], a sequence of [`PathKey`]s. Publishers hand
//! the [`Router`] a value together with a [`TraversalGraph`] describing how
//! to decompose that value into keys, one depth at a time. A subscriber runs
//! when the traversal produces exactly its path.
//!
//! Traversal is lazy: a stage's continuation only runs when some subscription
//! lives below the key it was emitted for, so the cost of a publish follows
//! the shape of the active subscriptions rather than the shape of the value.
//!
//! ## Core Concepts
//!
//! - **PathKey**: one comparable segment; [`PathKey::Unconstrained`] marks a
//!   level that is not discriminated
//! - **Subscription trie**: prefix tree of registered paths
//! - **Traversal graph**: named stages emitting `(key, next stage)` pairs
//! - **Router**: thread-safe registry running subscribers synchronously on
//!   the publishing thread
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pathsub::{Path, PathKey, Paths, Router, TraversalGraph};
//!
//! struct Order { region: String, rush: bool }
//!
//! let router = Router::new();
//! router.subscribe_fn(Path::new(vec![PathKey::Unconstrained, PathKey::Bool(true)])?, |o: &Order| {
//!     tracing::info!(region = %o.region, "rush order");
//! })?;
//!
//! let mut b = TraversalGraph::<Order>::builder();
//! let rush = b.stage("rush", |o: &Order| Paths::flat([PathKey::Unconstrained, PathKey::Bool(o.rush)]));
//! b.stage("region", move |o: &Order| {
//!     Paths::with_next([PathKey::Unconstrained, PathKey::str(&o.region)], rush)
//! });
//! let graph = b.build();
//!
//! let report = router.publish(&Order { region: "eu".into(), rush: true }, &graph)?;
//! assert_eq!(report.delivered, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod router;
/// Channel-backed subscriptions.
pub mod stream;
pub mod subscription;
pub mod traverse;
pub mod trie;

pub use config::RouterConfig;
pub use engine::PublishReport;
pub use error::{PubSubError, PubSubResult, RegistrationError, TraversalError};
pub use key::{Path, PathKey};
pub use router::Router;
pub use stream::SubscriptionStream;
pub use subscription::{FnSubscriber, Subscriber, SubscriptionId};
pub use traverse::{Next, Paths, StageId, Step, TraversalBuilder, TraversalGraph};
pub use trie::{NodeId, Registered, SubscriptionTrie};
