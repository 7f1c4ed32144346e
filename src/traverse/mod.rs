//! Traversers: decomposing a published value into path keys.
//!
//! A traversal is a [`TraversalGraph`] of named stages. Each stage looks at
//! the published value and returns [`Paths`], a list of keys paired with the
//! stage that handles the next depth ([`Next::Stage`]) or [`Next::Done`].
//!
//! ```rust,ignore
//! let mut b = TraversalGraph::<Event>::builder();
//! let field = b.stage("field", |e: &Event| {
//!     Paths::flat([PathKey::Unconstrained, PathKey::or_unconstrained(e.field.as_deref())])
//! });
//! b.stage("kind", move |e: &Event| {
//!     Paths::with_next([PathKey::Unconstrained, PathKey::str(&e.kind)], field)
//! });
//! let graph = b.build();
//! ```

/// Stage arena and builder.
pub mod graph;
/// Stage output types.
pub mod paths;

pub use graph::{StageId, TraversalBuilder, TraversalGraph};
pub use paths::{Next, Paths, Step};
