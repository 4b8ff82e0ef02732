//! Immediate dominators and retained sizes over the whole reachable heap

use crate::errors::{LeakgraphError, Result};
use crate::features::heap_graph::HeapGraph;
use crate::features::reference_matchers::{sorted_roots, MatcherIndex, ReferenceResolver};
use crate::shared::collections::LongObjectScatterMap;
use petgraph::algo::dominators;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info};

/// Dominator data of one reachable object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DominatorEntry {
    /// `0` when only the virtual root dominates the object
    pub immediate_dominator: u64,
    pub shallow_size: u64,
    /// Shallow size plus the retained size of every dominated child
    pub retained_size: u64,
    pub retained_count: u64,
}

/// Dominator tree of a snapshot, computed once and queried per leak
#[derive(Debug, Clone, Default)]
pub struct DominatorTree {
    entries: LongObjectScatterMap<DominatorEntry>,
    total_retained_size: u64,
    missing_targets: u64,
}

impl DominatorTree {
    /// Build the tree for every object reachable from the GC roots
    ///
    /// Edges dropped by `AlwaysIgnore` matchers are not part of the graph.
    pub fn compute(graph: &HeapGraph, matchers: &MatcherIndex) -> Result<Self> {
        let started = Instant::now();
        let mut resolver = ReferenceResolver::new(graph, matchers);
        let mut builder = ReachableGraph::new(graph.object_count());

        for root in sorted_roots(graph) {
            if !graph.contains(root.object_id()) {
                continue;
            }
            let matched = resolver.match_root(&root)?;
            if matched.as_ref().is_some_and(|m| m.verdict.is_always_ignore()) {
                continue;
            }
            let node = builder.node_for(root.object_id());
            builder.graph.add_edge(builder.root, node, ());
        }

        while let Some(node) = builder.queue.pop_front() {
            let object = graph.object(builder.graph[node])?;
            for edge in resolver.expand(&object) {
                let target = builder.node_for(edge.reference.target_id);
                builder.graph.add_edge(node, target, ());
            }
        }

        debug!(
            nodes = builder.order.len(),
            edges = builder.graph.edge_count(),
            "Reachable graph built"
        );

        let doms = dominators::simple_fast(&builder.graph, builder.root);

        let node_count = builder.graph.node_count();
        let mut shallow_size = vec![0u64; node_count];
        let mut retained_size = vec![0u64; node_count];
        let mut retained_count = vec![0u64; node_count];
        let mut idom = vec![builder.root; node_count];
        for &node in &builder.order {
            let object_id = builder.graph[node];
            idom[node.index()] = doms
                .immediate_dominator(node)
                .ok_or_else(|| LeakgraphError::graph_integrity(object_id, "dominators"))?;
            shallow_size[node.index()] = graph.shallow_size(object_id)?;
            retained_size[node.index()] = shallow_size[node.index()];
            retained_count[node.index()] = 1;
        }

        // A dominator is discovered before everything it dominates, so
        // reverse discovery order sees children before their dominator.
        let mut entries = LongObjectScatterMap::with_expected_elements(builder.order.len());
        for &node in builder.order.iter().rev() {
            let i = node.index();
            let dominator = idom[i];
            retained_size[dominator.index()] += retained_size[i];
            retained_count[dominator.index()] += retained_count[i];
        }
        for &node in &builder.order {
            let i = node.index();
            let object_id = builder.graph[node];
            entries.insert(
                object_id,
                DominatorEntry {
                    immediate_dominator: builder.graph[idom[i]],
                    shallow_size: shallow_size[i],
                    retained_size: retained_size[i],
                    retained_count: retained_count[i],
                },
            );
        }

        let tree = Self {
            entries,
            total_retained_size: retained_size[builder.root.index()],
            missing_targets: resolver.missing_targets(),
        };
        info!(
            reachable = tree.reachable_count(),
            total_retained_size = tree.total_retained_size,
            duration_ms = started.elapsed().as_millis() as u64,
            "Dominator tree computed"
        );
        Ok(tree)
    }

    pub fn entry(&self, object_id: u64) -> Option<&DominatorEntry> {
        self.entries.get(object_id)
    }

    /// `None` when the object is not reachable from any root
    pub fn retained_size(&self, object_id: u64) -> Option<u64> {
        self.entry(object_id).map(|e| e.retained_size)
    }

    pub fn retained_count(&self, object_id: u64) -> Option<u64> {
        self.entry(object_id).map(|e| e.retained_count)
    }

    /// `Some(0)` for objects only the virtual root dominates
    pub fn immediate_dominator(&self, object_id: u64) -> Option<u64> {
        self.entry(object_id).map(|e| e.immediate_dominator)
    }

    pub fn is_reachable(&self, object_id: u64) -> bool {
        self.entries.contains_key(object_id)
    }

    pub fn reachable_count(&self) -> usize {
        self.entries.size()
    }

    /// Shallow size of every reachable object
    pub fn total_retained_size(&self) -> u64 {
        self.total_retained_size
    }

    pub fn missing_targets(&self) -> u64 {
        self.missing_targets
    }
}

/// Petgraph view of the reachable heap, rooted at a virtual node
struct ReachableGraph {
    graph: DiGraph<u64, ()>,
    root: NodeIndex,
    nodes: LongObjectScatterMap<NodeIndex>,
    /// Discovery order, virtual root excluded
    order: Vec<NodeIndex>,
    queue: VecDeque<NodeIndex>,
}

impl ReachableGraph {
    fn new(object_count: usize) -> Self {
        let mut graph = DiGraph::with_capacity(object_count.min(1 << 20) + 1, 0);
        let root = graph.add_node(0);
        Self {
            graph,
            root,
            nodes: LongObjectScatterMap::new(),
            order: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    /// Node of `object_id`, queued for expansion on first sight
    fn node_for(&mut self, object_id: u64) -> NodeIndex {
        if let Some(&node) = self.nodes.get(object_id) {
            return node;
        }
        let node = self.graph.add_node(object_id);
        self.nodes.insert(object_id, node);
        self.order.push(node);
        self.queue.push_back(node);
        node
    }
}
