//! Growth domain models

pub mod path_tree;
pub mod report;

pub use path_tree::{NodeKey, ShortestPathNode, ShortestPathNodeId, ShortestPathTree};
pub use report::{GrowingNode, GrowthReport};
