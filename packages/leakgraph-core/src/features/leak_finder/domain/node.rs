//! Arena-backed BFS tree of paths from GC roots

use crate::errors::{next_node_index, Result};
use crate::features::heap_graph::HeapReference;
use crate::features::hprof::GcRoot;
use crate::features::reference_matchers::ReferenceMatcher;
use std::sync::Arc;

/// Handle into a [`LeakArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeakNodeId(u32);

impl LeakNodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One visited object in the BFS tree
#[derive(Debug, Clone)]
pub struct LeakNode {
    pub object_id: u64,
    /// `None` for nodes created directly from a GC root
    pub parent: Option<LeakNodeId>,
    /// Reference from the parent's object to this one
    pub incoming_edge: Option<HeapReference>,
    /// Matcher hit by `incoming_edge` (or by the root itself)
    pub matched: Option<Arc<ReferenceMatcher>>,
    /// Effective exclusion: own match, else inherited from the parent
    pub exclusion: Option<Arc<ReferenceMatcher>>,
    /// The root this path starts from; set on root nodes only
    pub gc_root: Option<GcRoot>,
    /// Edges from the root
    pub depth: u32,
}

impl LeakNode {
    pub fn root(root: GcRoot, matched: Option<Arc<ReferenceMatcher>>) -> Self {
        Self {
            object_id: root.object_id(),
            parent: None,
            incoming_edge: None,
            exclusion: matched.clone(),
            matched,
            gc_root: Some(root),
            depth: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_excluded(&self) -> bool {
        self.exclusion.is_some()
    }
}

/// Flat node storage; parents are handles, so dropping the arena drops the tree
#[derive(Debug, Clone, Default)]
pub struct LeakArena {
    nodes: Vec<LeakNode>,
}

impl LeakArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails once the arena holds `u32::MAX` nodes
    pub fn push(&mut self, node: LeakNode) -> Result<LeakNodeId> {
        let id = next_node_index(self.nodes.len(), node.object_id, "leak arena")?;
        self.nodes.push(node);
        Ok(LeakNodeId(id))
    }

    pub fn get(&self, id: LeakNodeId) -> &LeakNode {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes from the root down to `leaf`, inclusive
    pub fn path_to(&self, leaf: LeakNodeId) -> Vec<&LeakNode> {
        let mut path = Vec::with_capacity(self.get(leaf).depth as usize + 1);
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = self.get(id);
            path.push(node);
            current = node.parent;
        }
        path.reverse();
        path
    }

    /// The root node at the top of `leaf`'s path
    pub fn root_of(&self, leaf: LeakNodeId) -> &LeakNode {
        let mut node = self.get(leaf);
        while let Some(parent) = node.parent {
            node = self.get(parent);
        }
        node
    }
}
