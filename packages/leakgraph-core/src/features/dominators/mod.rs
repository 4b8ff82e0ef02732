//! Dominator Tree Feature
//!
//! Immediate dominators of every reachable object, computed with petgraph's
//! Cooper-Harvey-Kennedy `simple_fast` over a graph rooted at a virtual node
//! that points at every GC root. Retained sizes and counts accumulate bottom
//! up through the resulting tree.
//!
//! Computed once per snapshot, then queried per leak.

pub mod application;

pub use application::{DominatorEntry, DominatorTree};
