//! Shortest-Path Leak Finder Feature
//!
//! Multi-source BFS from all GC roots that finds a shortest reference path to
//! every leaking object in one traversal.
//!
//! # Architecture
//!
//! ```text
//! leak_finder/
//! ├── domain/          # LeakNode arena (parents are handles)
//! └── application/     # ShortestPathFinder (two-queue BFS)
//! ```
//!
//! # Exclusions
//!
//! A reference hit by a non-ignoring matcher is still followed, but the node
//! it reaches is queued behind every unexcluded node and its descendants
//! inherit the exclusion. An object reachable both ways therefore always
//! gets its unexcluded path, even when that path is longer.

pub mod application;
pub mod domain;

pub use application::{FoundPath, PathFindingResult, ShortestPathFinder};
pub use domain::{LeakArena, LeakNode, LeakNodeId};
