//! Repeated-Snapshot Growth Detector Feature
//!
//! Runs the shortest-path traversal over every reachable object of each
//! snapshot and collapses objects into nodes by structural path, since
//! object ids are not stable between dumps. Paths whose object count rises
//! between every consecutive pair of snapshots are reported.
//!
//! # Architecture
//!
//! ```text
//! growth/
//! ├── domain/          # ShortestPathTree, NodeKey, GrowthReport
//! └── application/     # HeapGrowthDetector
//! ```

pub mod application;
pub mod domain;

pub use application::HeapGrowthDetector;
pub use domain::{
    GrowingNode, GrowthReport, NodeKey, ShortestPathNode, ShortestPathNodeId, ShortestPathTree,
};
