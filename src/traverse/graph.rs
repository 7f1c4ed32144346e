//! Arena of named traversal stages.
//!
//! Stages are appended to a [`TraversalBuilder`] and referenced by the
//! [`StageId`] it hands back. A stage can only name ids that already exist
//! when its closure is written, so every continuation points to an earlier
//! stage and the graph is acyclic by construction. The engine re-checks the
//! ordering on every step.

use std::fmt;

use crate::key::PathKey;

use super::paths::{Next, Paths};

/// Index of a stage inside a [`TraversalGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(usize);

impl StageId {
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Position of the stage in its graph.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

type StageFn<T> = dyn Fn(&T) -> Result<Paths, String> + Send + Sync;

pub(crate) struct Stage<T> {
    pub(crate) name: String,
    f: Box<StageFn<T>>,
}

impl<T> Stage<T> {
    pub(crate) fn run(&self, value: &T) -> Result<Paths, String> {
        (self.f)(value)
    }
}

/// Accumulates stages bottom-up.
pub struct TraversalBuilder<T> {
    stages: Vec<Stage<T>>,
}

impl<T> TraversalBuilder<T> {
    /// Adds an infallible stage.
    pub fn stage<F>(&mut self, name: impl Into<String>, f: F) -> StageId
    where
        F: Fn(&T) -> Paths + Send + Sync + 'static,
    {
        self.try_stage(name, move |value: &T| Ok(f(value)))
    }

    /// Adds a stage that may reject a value; the rejection is reported for
    /// this branch only.
    pub fn try_stage<F>(&mut self, name: impl Into<String>, f: F) -> StageId
    where
        F: Fn(&T) -> Result<Paths, String> + Send + Sync + 'static,
    {
        self.stages.push(Stage {
            name: name.into(),
            f: Box::new(f),
        });
        StageId(self.stages.len() - 1)
    }

    /// Finishes the graph. The most recently added stage becomes the root.
    #[must_use]
    pub fn build(self) -> TraversalGraph<T> {
        let root = self.stages.len().checked_sub(1).map(StageId);
        TraversalGraph {
            stages: self.stages,
            root,
        }
    }
}

/// A directed acyclic graph of traversal stages, entered at its root.
pub struct TraversalGraph<T> {
    stages: Vec<Stage<T>>,
    root: Option<StageId>,
}

impl<T> TraversalGraph<T> {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> TraversalBuilder<T> {
        TraversalBuilder { stages: Vec::new() }
    }

    /// A chain emitting exactly `keys`, one per depth, regardless of the
    /// value.
    pub fn linear<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<PathKey>,
    {
        let keys: Vec<PathKey> = keys.into_iter().map(Into::into).collect();
        let mut builder = Self::builder();
        let mut next = Next::Done;
        for (depth, key) in keys.into_iter().enumerate().rev() {
            let stage = builder.stage(format!("linear[{depth}]"), move |_: &T| {
                Paths::with_next([key.clone()], next)
            });
            next = Next::Stage(stage);
        }
        builder.build()
    }

    /// Entry stage, `None` for an empty graph.
    #[must_use]
    pub const fn root(&self) -> Option<StageId> {
        self.root
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the graph has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Name given to a stage at build time.
    #[must_use]
    pub fn name(&self, stage: StageId) -> Option<&str> {
        self.stages.get(stage.0).map(|s| s.name.as_str())
    }

    pub(crate) fn stage(&self, stage: StageId) -> Option<&Stage<T>> {
        self.stages.get(stage.0)
    }
}

impl<T> fmt::Debug for TraversalGraph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.name.as_str()).collect();
        f.debug_struct("TraversalGraph")
            .field("stages", &names)
            .field("root", &self.root)
            .finish()
    }
}
