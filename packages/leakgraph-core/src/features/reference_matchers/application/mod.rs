//! Reference matcher application layer

pub mod index;
pub mod resolver;

pub use index::MatcherIndex;
pub use resolver::{sorted_roots, MatchedReference, ReferenceResolver};
