//! Path keys and subscription paths.
//!
//! A [`PathKey`] is one segment of a structural path. Keys compare by exact
//! equality; [`PathKey::Unconstrained`] is an ordinary key whose meaning
//! ("this level is not discriminated") is a convention shared by traversers
//! and subscribers, not a wildcard.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RegistrationError;

/// One segment of a structural path.
///
/// Serialized untagged: `null` is the unconstrained marker, JSON booleans,
/// integers and strings are literal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    /// The level is not being discriminated.
    Unconstrained,
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// String literal. The empty string is a legitimate value, distinct from
    /// [`PathKey::Unconstrained`].
    Str(String),
}

impl PathKey {
    /// Creates a string key.
    #[must_use]
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Returns true for the unconstrained marker.
    #[must_use]
    pub const fn is_unconstrained(&self) -> bool {
        matches!(self, Self::Unconstrained)
    }

    /// Maps an optional field to a key, absent values becoming the
    /// unconstrained marker.
    #[must_use]
    pub fn or_unconstrained<K: Into<PathKey>>(value: Option<K>) -> Self {
        value.map_or(Self::Unconstrained, Into::into)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconstrained => write!(f, "*"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for PathKey {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for PathKey {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&String> for PathKey {
    fn from(s: &String) -> Self {
        Self::Str(s.clone())
    }
}

impl From<i64> for PathKey {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for PathKey {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A non-empty ordered sequence of [`PathKey`]s identifying a subscription's
/// interest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<PathKey>", into = "Vec<PathKey>")]
pub struct Path(Vec<PathKey>);

impl Path {
    /// Builds a path, rejecting an empty key sequence.
    pub fn new<I, K>(keys: I) -> Result<Self, RegistrationError>
    where
        I: IntoIterator<Item = K>,
        K: Into<PathKey>,
    {
        let keys: Vec<PathKey> = keys.into_iter().map(Into::into).collect();
        Self::try_from(keys)
    }

    /// Number of keys; equal to the depth of the trie node the path names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The keys in order.
    #[must_use]
    pub fn keys(&self) -> &[PathKey] {
        &self.0
    }

    /// Iterates over the keys in order.
    pub fn iter(&self) -> std::slice::Iter<'_, PathKey> {
        self.0.iter()
    }
}

impl TryFrom<Vec<PathKey>> for Path {
    type Error = RegistrationError;

    fn try_from(keys: Vec<PathKey>) -> Result<Self, Self::Error> {
        if keys.is_empty() {
            return Err(RegistrationError::EmptyPath);
        }
        Ok(Self(keys))
    }
}

impl From<Path> for Vec<PathKey> {
    fn from(path: Path) -> Self {
        path.0
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathKey;
    type IntoIter = std::slice::Iter<'a, PathKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}")?;
        }
        write!(f, "]")
    }
}
