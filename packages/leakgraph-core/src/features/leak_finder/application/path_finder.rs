//! Multi-source BFS from every GC root to a set of leaking objects
//!
//! Two FIFO queues: paths without exclusions are fully explored before any
//! path that went through an excluded reference. Every target is found in a
//! single traversal.

use crate::errors::Result;
use crate::features::heap_graph::HeapGraph;
use crate::features::leak_finder::domain::{LeakArena, LeakNode, LeakNodeId};
use crate::features::reference_matchers::{sorted_roots, MatcherIndex, ReferenceResolver};
use crate::shared::collections::LongScatterSet;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Shortest path found for one leaking object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoundPath {
    pub leaking_object_id: u64,
    pub leaf: LeakNodeId,
}

/// Output of [`ShortestPathFinder::find_paths`]
#[derive(Debug, Clone, Default)]
pub struct PathFindingResult {
    pub arena: LeakArena,
    /// In the order the targets were dequeued
    pub found: Vec<FoundPath>,
    /// Leaking ids no root reaches, ascending
    pub not_found: Vec<u64>,
    /// References whose target id is not in the index
    pub missing_targets: u64,
    /// Distinct objects dequeued
    pub visited_objects: u64,
}

impl PathFindingResult {
    /// Nodes from the root down to the leaking object
    pub fn path(&self, found: &FoundPath) -> Vec<&LeakNode> {
        self.arena.path_to(found.leaf)
    }
}

/// BFS over a [`HeapGraph`] honoring reference matchers
pub struct ShortestPathFinder<'g> {
    graph: &'g HeapGraph,
    matchers: &'g MatcherIndex,
}

impl<'g> ShortestPathFinder<'g> {
    pub fn new(graph: &'g HeapGraph, matchers: &'g MatcherIndex) -> Self {
        Self { graph, matchers }
    }

    /// Find a shortest path to each id in `leaking_object_ids`
    ///
    /// Unreachable ids and ids absent from the index are reported in
    /// `not_found` rather than failing.
    pub fn find_paths(&self, leaking_object_ids: &LongScatterSet) -> Result<PathFindingResult> {
        let mut traversal = Traversal::new(self.graph.object_count());
        let mut resolver = ReferenceResolver::new(self.graph, self.matchers);

        let mut remaining = 0usize;
        for id in leaking_object_ids.iter() {
            if self.graph.contains(id) {
                remaining += 1;
            }
        }
        debug!(
            targets = leaking_object_ids.size(),
            indexed_targets = remaining,
            roots = self.graph.gc_roots().len(),
            "Searching paths to leaking objects"
        );

        let mut skipped_roots = 0u64;
        for root in sorted_roots(self.graph) {
            if !self.graph.contains(root.object_id()) {
                skipped_roots += 1;
                continue;
            }
            let matched = resolver.match_root(&root)?;
            if matched.as_ref().is_some_and(|m| m.verdict.is_always_ignore()) {
                continue;
            }
            traversal.enqueue(LeakNode::root(root, matched))?;
        }
        if skipped_roots > 0 {
            debug!(skipped_roots, "GC roots pointing at objects missing from the index");
        }

        let mut found = Vec::new();
        let mut found_ids = LongScatterSet::new();
        while remaining > 0 {
            let Some(node_id) = traversal.poll() else {
                break;
            };
            let (object_id, depth, exclusion) = {
                let node = traversal.arena.get(node_id);
                (node.object_id, node.depth, node.exclusion.clone())
            };
            traversal.visited_objects += 1;

            if leaking_object_ids.contains(object_id) && found_ids.add(object_id) {
                found.push(FoundPath {
                    leaking_object_id: object_id,
                    leaf: node_id,
                });
                remaining -= 1;
                if remaining == 0 {
                    break;
                }
            }

            let object = self.graph.object(object_id)?;
            for edge in resolver.expand(&object) {
                let own = edge.matcher;
                let inherited = own.clone().or_else(|| exclusion.clone());
                crate::trace_edge!(
                    from = object_id,
                    to = edge.reference.target_id,
                    name = %edge.reference.name,
                    excluded = inherited.is_some(),
                    "edge"
                );
                traversal.enqueue(LeakNode {
                    object_id: edge.reference.target_id,
                    parent: Some(node_id),
                    incoming_edge: Some(edge.reference),
                    matched: own,
                    exclusion: inherited,
                    gc_root: None,
                    depth: depth + 1,
                })?;
            }
        }

        let mut not_found: Vec<u64> = leaking_object_ids
            .iter()
            .filter(|id| !found_ids.contains(*id))
            .collect();
        not_found.sort_unstable();

        info!(
            found = found.len(),
            not_found = not_found.len(),
            visited = traversal.visited_objects,
            missing_targets = resolver.missing_targets(),
            "Path finding complete"
        );

        Ok(PathFindingResult {
            arena: traversal.arena,
            found,
            not_found,
            missing_targets: resolver.missing_targets(),
            visited_objects: traversal.visited_objects,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Internal: queue bookkeeping
// ═══════════════════════════════════════════════════════════════════════════

struct Traversal {
    arena: LeakArena,
    to_visit: VecDeque<LeakNodeId>,
    to_visit_excluded: VecDeque<LeakNodeId>,
    /// Ids queued on `to_visit`; first visit wins
    queued: LongScatterSet,
    /// Ids queued on `to_visit_excluded`
    queued_excluded: LongScatterSet,
    visited_objects: u64,
}

impl Traversal {
    fn new(object_count: usize) -> Self {
        Self {
            arena: LeakArena::new(),
            to_visit: VecDeque::new(),
            to_visit_excluded: VecDeque::new(),
            queued: LongScatterSet::with_expected_elements(object_count.min(1 << 20)),
            queued_excluded: LongScatterSet::new(),
            visited_objects: 0,
        }
    }

    /// Queue `node` unless its object already has an equal or better entry.
    /// An unexcluded entry supersedes a pending excluded one.
    fn enqueue(&mut self, node: LeakNode) -> Result<()> {
        let object_id = node.object_id;
        if self.queued.contains(object_id) {
            return Ok(());
        }
        if node.is_excluded() {
            if self.queued_excluded.add(object_id) {
                let id = self.arena.push(node)?;
                self.to_visit_excluded.push_back(id);
            }
        } else {
            self.queued.add(object_id);
            let id = self.arena.push(node)?;
            self.to_visit.push_back(id);
        }
        Ok(())
    }

    /// Next node: `to_visit` drains first, then stale-free excluded entries
    fn poll(&mut self) -> Option<LeakNodeId> {
        if let Some(id) = self.to_visit.pop_front() {
            return Some(id);
        }
        while let Some(id) = self.to_visit_excluded.pop_front() {
            let object_id = self.arena.get(id).object_id;
            // Superseded by an unexcluded path
            if self.queued.add(object_id) {
                return Some(id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::features::hprof::{FieldType, GcRoot, HeapDumpBuilder, HeapValue};
    use crate::features::reference_matchers::{ReferenceMatcher, ReferencePattern};

    fn graph(builder: &HeapDumpBuilder) -> HeapGraph {
        HeapGraph::open(Box::new(builder.build_source().unwrap()), &AnalysisConfig::default()).unwrap()
    }

    fn targets(ids: &[u64]) -> LongScatterSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_root_only_path() {
        let mut builder = HeapDumpBuilder::new();
        let class = builder.class("com.example.Leak", &[]);
        let leak = builder.instance(class, &[]);
        builder.root(GcRoot::JniGlobal {
            id: leak,
            jni_global_ref_id: 1,
        });
        let graph = graph(&builder);
        let matchers = MatcherIndex::empty();

        let result = ShortestPathFinder::new(&graph, &matchers)
            .find_paths(&targets(&[leak]))
            .unwrap();
        assert_eq!(result.found.len(), 1);
        let path = result.path(&result.found[0]);
        assert_eq!(path.len(), 1);
        assert!(path[0].exclusion.is_none());
    }

    #[test]
    fn test_shortest_path_wins() {
        let mut builder = HeapDumpBuilder::new();
        let node = builder.class("com.example.Node", &[("next", FieldType::Object), ("skip", FieldType::Object)]);
        let leak = builder.instance(node, &[]);
        let c = builder.instance(node, &[("next", HeapValue::Object(leak))]);
        let b = builder.instance(node, &[("next", HeapValue::Object(c))]);
        let a = builder.instance(
            node,
            &[("next", HeapValue::Object(b)), ("skip", HeapValue::Object(leak))],
        );
        builder.root(GcRoot::Unknown { id: a });
        let graph = graph(&builder);
        let matchers = MatcherIndex::empty();

        let result = ShortestPathFinder::new(&graph, &matchers)
            .find_paths(&targets(&[leak]))
            .unwrap();
        let path = result.path(&result.found[0]);
        let ids: Vec<u64> = path.iter().map(|n| n.object_id).collect();
        assert_eq!(ids, vec![a, leak]);
        assert_eq!(path[1].incoming_edge.as_ref().unwrap().name.to_string(), "skip");
    }

    #[test]
    fn test_unexcluded_path_preferred_over_shorter_excluded_one() {
        let mut builder = HeapDumpBuilder::new();
        let node = builder.class("com.example.Node", &[("next", FieldType::Object)]);
        let holder = builder.class("com.example.Cache", &[("entry", FieldType::Object)]);
        let leak = builder.instance(node, &[]);
        // root -> cache -(excluded)-> leak
        let cache = builder.instance(holder, &[("entry", HeapValue::Object(leak))]);
        // root -> n1 -> n2 -> n3 -> leak
        let n3 = builder.instance(node, &[("next", HeapValue::Object(leak))]);
        let n2 = builder.instance(node, &[("next", HeapValue::Object(n3))]);
        let n1 = builder.instance(node, &[("next", HeapValue::Object(n2))]);
        builder.root(GcRoot::Unknown { id: cache });
        builder.root(GcRoot::Unknown { id: n1 });
        let graph = graph(&builder);
        let matchers = MatcherIndex::new(&[ReferenceMatcher::library_leak(
            ReferencePattern::instance_field("com.example.Cache", "entry"),
            "cache",
        )])
        .unwrap();

        let result = ShortestPathFinder::new(&graph, &matchers)
            .find_paths(&targets(&[leak]))
            .unwrap();
        let path = result.path(&result.found[0]);
        assert_eq!(path.len(), 5);
        assert!(path.iter().all(|n| n.exclusion.is_none()));
    }

    #[test]
    fn test_excluded_only_path_is_still_reported() {
        let mut builder = HeapDumpBuilder::new();
        let node = builder.class("com.example.Node", &[("next", FieldType::Object)]);
        let holder = builder.class("com.example.Cache", &[("entry", FieldType::Object)]);
        let leak = builder.instance(node, &[]);
        let middle = builder.instance(node, &[("next", HeapValue::Object(leak))]);
        let cache = builder.instance(holder, &[("entry", HeapValue::Object(middle))]);
        builder.root(GcRoot::Unknown { id: cache });
        let graph = graph(&builder);
        let matchers = MatcherIndex::new(&[ReferenceMatcher::ignored_unless_reachable_from_leak(
            ReferencePattern::instance_field("com.example.Cache", "entry"),
        )])
        .unwrap();

        let result = ShortestPathFinder::new(&graph, &matchers)
            .find_paths(&targets(&[leak]))
            .unwrap();
        let path = result.path(&result.found[0]);
        assert!(path[0].exclusion.is_none());
        assert!(path[1].matched.is_some());
        assert!(path[2].matched.is_none());
        assert!(path[1..].iter().all(|n| n.exclusion.is_some()));
    }

    #[test]
    fn test_always_ignore_cuts_the_edge() {
        let mut builder = HeapDumpBuilder::new();
        let holder = builder.class("com.example.Cache", &[("entry", FieldType::Object)]);
        let leak = builder.instance(holder, &[]);
        let cache = builder.instance(holder, &[("entry", HeapValue::Object(leak))]);
        builder.root(GcRoot::Unknown { id: cache });
        let graph = graph(&builder);
        let matchers = MatcherIndex::new(&[ReferenceMatcher::ignored(ReferencePattern::instance_field(
            "com.example.Cache",
            "entry",
        ))])
        .unwrap();

        let result = ShortestPathFinder::new(&graph, &matchers)
            .find_paths(&targets(&[leak, 0xdead]))
            .unwrap();
        assert!(result.found.is_empty());
        assert_eq!(result.not_found, vec![leak, 0xdead]);
    }
}
