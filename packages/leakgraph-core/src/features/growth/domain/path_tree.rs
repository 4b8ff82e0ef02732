//! Structural shortest-path tree of one snapshot
//!
//! Objects reached through the same chain of `(edge, class)` steps collapse
//! into one node, so trees from different snapshots line up even though
//! object ids do not.

use crate::errors::{next_node_index, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a node under its parent
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    /// Field name, `[]` for array entries, or the GC root type under the root
    pub edge_name: String,
    /// Class of the objects collapsed into the node
    pub owning_class_name: String,
}

impl NodeKey {
    pub fn new(edge_name: impl Into<String>, owning_class_name: impl Into<String>) -> Self {
        Self {
            edge_name: edge_name.into(),
            owning_class_name: owning_class_name.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.edge_name, self.owning_class_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortestPathNodeId(u32);

impl ShortestPathNodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct ShortestPathNode {
    pub key: NodeKey,
    pub parent: Option<ShortestPathNodeId>,
    pub self_object_count: u64,
    /// Versus the same path in the previous snapshot; `0` until diffed
    pub self_object_count_increase: u64,
    children: FxHashMap<NodeKey, ShortestPathNodeId>,
}

impl ShortestPathNode {
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Arena of [`ShortestPathNode`]s under a virtual root
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    nodes: Vec<ShortestPathNode>,
}

impl Default for ShortestPathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortestPathTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![ShortestPathNode {
                key: NodeKey::new("", ""),
                parent: None,
                self_object_count: 0,
                self_object_count_increase: 0,
                children: FxHashMap::default(),
            }],
        }
    }

    pub fn root(&self) -> ShortestPathNodeId {
        ShortestPathNodeId(0)
    }

    pub fn get(&self, id: ShortestPathNodeId) -> &ShortestPathNode {
        &self.nodes[id.index()]
    }

    /// Node count, virtual root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn child(&self, parent: ShortestPathNodeId, key: &NodeKey) -> Option<ShortestPathNodeId> {
        self.nodes[parent.index()].children.get(key).copied()
    }

    /// Count one more object at `key` under `parent`, creating the node if needed.
    /// `object_id` only labels the error once the tree holds `u32::MAX` nodes.
    pub fn add_object(
        &mut self,
        parent: ShortestPathNodeId,
        key: NodeKey,
        object_id: u64,
    ) -> Result<ShortestPathNodeId> {
        let id = match self.child(parent, &key) {
            Some(id) => id,
            None => {
                let id = ShortestPathNodeId(next_node_index(self.nodes.len(), object_id, "path tree")?);
                self.nodes[parent.index()].children.insert(key.clone(), id);
                self.nodes.push(ShortestPathNode {
                    key,
                    parent: Some(parent),
                    self_object_count: 0,
                    self_object_count_increase: 0,
                    children: FxHashMap::default(),
                });
                id
            }
        };
        self.nodes[id.index()].self_object_count += 1;
        Ok(id)
    }

    /// Keys from the first child of the root down to `id`
    pub fn path(&self, id: ShortestPathNodeId) -> Vec<NodeKey> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id);
            if node.parent.is_none() {
                break;
            }
            path.push(node.key.clone());
            current = node.parent;
        }
        path.reverse();
        path
    }

    pub fn find(&self, path: &[NodeKey]) -> Option<ShortestPathNodeId> {
        path.iter()
            .try_fold(self.root(), |node, key| self.child(node, key))
    }

    /// Record increases against `previous` and return the nodes that grew
    ///
    /// Walks both trees along matching paths only. A node with no
    /// counterpart in `previous` never counts as growing. The result is
    /// sorted by path.
    pub fn diff(&mut self, previous: &ShortestPathTree) -> Vec<ShortestPathNodeId> {
        let mut growing = Vec::new();
        let mut stack = vec![(self.root(), previous.root())];
        while let Some((current, before)) = stack.pop() {
            let matched: Vec<_> = self.nodes[current.index()]
                .children
                .iter()
                .filter_map(|(key, &child)| previous.child(before, key).map(|prev| (child, prev)))
                .collect();
            for (child, prev) in matched {
                let was = previous.get(prev).self_object_count;
                let node = &mut self.nodes[child.index()];
                node.self_object_count_increase = node.self_object_count.saturating_sub(was);
                if node.self_object_count > was {
                    growing.push(child);
                }
                stack.push((child, prev));
            }
        }
        growing.sort_by_cached_key(|&id| self.path(id));
        growing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(edge: &str, class: &str) -> NodeKey {
        NodeKey::new(edge, class)
    }

    fn tree(list_size: u64) -> ShortestPathTree {
        let mut tree = ShortestPathTree::new();
        let holder = tree.add_object(tree.root(), key("StickyClass", "Holder"), 1).unwrap();
        let list = tree.add_object(holder, key("items", "java.lang.Object[]"), 2).unwrap();
        for _ in 0..list_size {
            tree.add_object(list, key("[]", "Item"), 3).unwrap();
        }
        tree
    }

    #[test]
    fn test_same_structural_path_collapses() {
        let tree = tree(3);
        assert_eq!(tree.len(), 4);
        let items = tree
            .find(&[key("StickyClass", "Holder"), key("items", "java.lang.Object[]"), key("[]", "Item")])
            .unwrap();
        assert_eq!(tree.get(items).self_object_count, 3);
        assert_eq!(tree.path(items).len(), 3);
    }

    #[test]
    fn test_diff_reports_strict_increase_only() {
        let previous = tree(2);
        let mut current = tree(4);
        let growing = current.diff(&previous);
        assert_eq!(growing.len(), 1);
        assert_eq!(current.get(growing[0]).self_object_count_increase, 2);
        assert_eq!(current.get(growing[0]).key, key("[]", "Item"));

        let mut same = tree(4);
        assert!(same.diff(&current).is_empty());
    }

    #[test]
    fn test_new_nodes_are_not_growth() {
        let mut previous = ShortestPathTree::new();
        previous.add_object(previous.root(), key("StickyClass", "Holder"), 1).unwrap();
        let mut current = tree(5);
        assert!(current.diff(&previous).is_empty());
    }
}
