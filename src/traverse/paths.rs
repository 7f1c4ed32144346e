use crate::key::PathKey;

use super::graph::StageId;

/// Continuation of a branch after one key has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Next {
    /// The value has no deeper structure on this branch.
    Done,
    /// Continue with the given stage of the same graph.
    Stage(StageId),
}

impl From<StageId> for Next {
    fn from(stage: StageId) -> Self {
        Self::Stage(stage)
    }
}

/// One `(key, continuation)` pair emitted by a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Key appended to the path on this branch.
    pub key: PathKey,
    /// What to run once the key has been matched.
    pub next: Next,
}

impl Step {
    /// Creates a step.
    pub fn new(key: impl Into<PathKey>, next: impl Into<Next>) -> Self {
        Self {
            key: key.into(),
            next: next.into(),
        }
    }
}

/// The fan-out a stage produces for one value at one depth.
///
/// An empty `Paths` ends the branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paths {
    steps: Vec<Step>,
}

impl Paths {
    /// No deeper structure.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every key ends its branch.
    pub fn flat<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<PathKey>,
    {
        Self::with_next(keys, Next::Done)
    }

    /// Every key continues into the same stage.
    pub fn with_next<I, K>(keys: I, next: impl Into<Next>) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<PathKey>,
    {
        let next = next.into();
        keys.into_iter().map(|k| Step::new(k, next)).collect()
    }

    /// Explicit key/continuation pairs.
    pub fn from_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        steps.into_iter().collect()
    }

    /// Appends one step.
    pub fn push(&mut self, key: impl Into<PathKey>, next: impl Into<Next>) {
        self.steps.push(Step::new(key, next));
    }

    /// Appends every step of `other`, keeping order.
    #[must_use]
    pub fn chain(mut self, other: Paths) -> Self {
        self.steps.extend(other.steps);
        self
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true when the branch ends here.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterates over the steps in emission order.
    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }
}

impl FromIterator<Step> for Paths {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Paths {
    type Item = Step;
    type IntoIter = std::vec::IntoIter<Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

impl<'a> IntoIterator for &'a Paths {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
