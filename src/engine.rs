//! Lazy fan-out publish engine.
//!
//! The engine walks a [`TraversalGraph`] and the [`SubscriptionTrie`] in
//! lockstep, depth-first from the root. A stage's continuation is only run
//! when the trie has a child for the emitted key and that child has
//! descendants, so the work done per publish is bounded by the shape of the
//! active subscriptions rather than by the shape of the value.
//!
//! Routing runs under the caller's read guard and only collects the matched
//! subscribers; [`dispatch`] then invokes them with the guard released, so a
//! subscriber may itself subscribe or unsubscribe. New subscriptions apply to
//! the next publish; a subscription removed before its turn is skipped.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{panic_message, TraversalError};
use crate::subscription::{Subscriber, SubscriptionId};
use crate::traverse::graph::Stage;
use crate::traverse::{Next, Paths, StageId, TraversalGraph};
use crate::trie::{NodeId, SubscriptionTrie};

/// Outcome of one publish call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that ran to completion.
    pub delivered: usize,
    /// Stage invocations performed.
    pub traverser_calls: usize,
    /// Steps not followed: keys with no matching trie child, plus
    /// continuations skipped because nothing is subscribed below their node.
    pub pruned: usize,
    /// Failures isolated to a single branch or subscriber.
    pub errors: Vec<TraversalError>,
}

impl PublishReport {
    /// Returns true when no branch or subscriber failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub(crate) struct Delivery<T> {
    id: SubscriptionId,
    subscriber: Arc<dyn Subscriber<T>>,
    active: Arc<AtomicBool>,
}

pub(crate) struct FanOut<T> {
    pub(crate) deliveries: Vec<Delivery<T>>,
    pub(crate) report: PublishReport,
}

struct Pending {
    node: NodeId,
    stage: StageId,
}

/// Routes `value` through `trie`, starting with `start` at the root.
pub(crate) fn route<T>(
    trie: &SubscriptionTrie<T>,
    graph: &TraversalGraph<T>,
    start: StageId,
    value: &T,
    isolate_panics: bool,
) -> FanOut<T> {
    let mut deliveries = Vec::new();
    let mut report = PublishReport::default();

    if !trie.has_children(trie.root()) {
        return FanOut { deliveries, report };
    }

    let mut visited: HashSet<(NodeId, StageId)> = HashSet::new();
    let mut fired: HashSet<NodeId> = HashSet::new();
    let mut pending = vec![Pending {
        node: trie.root(),
        stage: start,
    }];

    while let Some(Pending { node, stage }) = pending.pop() {
        if !visited.insert((node, stage)) {
            continue;
        }

        let depth = trie.depth(node).unwrap_or_default();
        let Some(entry) = graph.stage(stage) else {
            report.errors.push(TraversalError::UnknownStage {
                stage: stage.index(),
                stages: graph.len(),
            });
            continue;
        };

        report.traverser_calls += 1;
        let paths = match run_stage(entry, value, depth, isolate_panics) {
            Ok(paths) => paths,
            Err(err) => {
                tracing::warn!(stage = %entry.name, depth, error = %err, "traverser failed, branch skipped");
                report.errors.push(err);
                continue;
            }
        };

        let mut branches = Vec::with_capacity(paths.len());
        for step in paths {
            let Some(child) = trie.child(node, &step.key) else {
                tracing::trace!(stage = %entry.name, depth, key = %step.key, "pruned");
                report.pruned += 1;
                continue;
            };

            if fired.insert(child) {
                deliveries.extend(trie.terminals_at(child).map(|registered| Delivery {
                    id: registered.id(),
                    subscriber: Arc::clone(registered.subscriber()),
                    active: Arc::clone(registered.active()),
                }));
            }

            let Next::Stage(next) = step.next else {
                continue;
            };
            if next >= stage {
                report.errors.push(TraversalError::BackwardEdge {
                    stage: entry.name.clone(),
                    next: next.index(),
                });
                continue;
            }
            if trie.has_children(child) {
                branches.push(Pending { node: child, stage: next });
            } else {
                report.pruned += 1;
            }
        }

        // Reverse so siblings are explored in emission order.
        pending.extend(branches.into_iter().rev());
    }

    FanOut { deliveries, report }
}

/// Invokes every collected subscriber that is still subscribed, in order.
pub(crate) fn dispatch<T>(
    deliveries: Vec<Delivery<T>>,
    value: &T,
    isolate_panics: bool,
    report: &mut PublishReport,
) {
    for Delivery {
        id,
        subscriber,
        active,
    } in deliveries
    {
        if !active.load(Ordering::Acquire) {
            tracing::trace!(subscription = %id, "skipped delivery to removed subscription");
            continue;
        }
        if !isolate_panics {
            subscriber.deliver(value);
            report.delivered += 1;
            continue;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| subscriber.deliver(value))) {
            Ok(()) => report.delivered += 1,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(subscription = %id, name = subscriber.name(), %message, "subscriber panicked");
                report.errors.push(TraversalError::SubscriberPanicked {
                    subscription: id,
                    name: subscriber.name().to_string(),
                    message,
                });
            }
        }
    }
}

fn run_stage<T>(
    stage: &Stage<T>,
    value: &T,
    depth: usize,
    isolate_panics: bool,
) -> Result<Paths, TraversalError> {
    let outcome = if isolate_panics {
        panic::catch_unwind(AssertUnwindSafe(|| stage.run(value))).map_err(|payload| {
            TraversalError::TraverserPanicked {
                stage: stage.name.clone(),
                depth,
                message: panic_message(payload.as_ref()),
            }
        })?
    } else {
        stage.run(value)
    };

    outcome.map_err(|reason| TraversalError::TraverserFailed {
        stage: stage.name.clone(),
        depth,
        reason,
    })
}
