//! Growth detection results

use super::path_tree::NodeKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A structural path whose object count grew in every snapshot pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowingNode {
    /// From the GC root step down to the node
    pub path: Vec<NodeKey>,
    /// In the last analyzed snapshot
    pub self_object_count: u64,
    /// Versus the snapshot before the last one
    pub self_object_count_increase: u64,
    /// Versus the first analyzed snapshot
    pub total_increase: u64,
}

impl fmt::Display for GrowingNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", key)?;
        }
        write!(
            f,
            " [{} objects, +{} since previous, +{} total]",
            self.self_object_count, self.self_object_count_increase, self.total_increase
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthReport {
    pub snapshots_analyzed: usize,
    /// Sorted by path
    pub growing_nodes: Vec<GrowingNode>,
    /// Stopped with snapshots left unread because nothing was growing
    pub early_exit: bool,
}

impl GrowthReport {
    pub fn is_growing(&self) -> bool {
        !self.growing_nodes.is_empty()
    }
}
