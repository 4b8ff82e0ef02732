//! Repeated-snapshot growth detection

use crate::config::AnalysisConfig;
use crate::errors::Result;
use crate::features::growth::domain::{GrowingNode, GrowthReport, NodeKey, ShortestPathTree};
use crate::features::heap_graph::{HeapGraph, ReferenceKind};
use crate::features::reference_matchers::{
    sorted_roots, MatcherIndex, ReferenceMatcher, ReferenceResolver,
};
use crate::shared::collections::LongScatterSet;
use crate::shared::constants::edges;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info};

const UNKNOWN_CLASS: &str = "unknown";

/// Finds structural paths whose object count keeps increasing
///
/// Snapshots are consumed one at a time; only the previous snapshot's tree
/// is kept in memory.
#[derive(Debug, Clone)]
pub struct HeapGrowthDetector {
    matchers: MatcherIndex,
    config: AnalysisConfig,
}

impl HeapGrowthDetector {
    pub fn new(reference_matchers: &[ReferenceMatcher]) -> Result<Self> {
        Ok(Self {
            matchers: MatcherIndex::new(reference_matchers)?,
            config: AnalysisConfig::default(),
        })
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Diff up to `max_growth_snapshots` snapshots in order
    ///
    /// A path is reported only if its count went up between every
    /// consecutive pair. Stops pulling snapshots as soon as a pair leaves
    /// no candidate.
    pub fn find_growing_objects<I>(&self, snapshots: I) -> Result<GrowthReport>
    where
        I: IntoIterator<Item = HeapGraph>,
    {
        self.config.validate()?;
        let started = Instant::now();

        let mut report = GrowthReport::default();
        let mut previous: Option<ShortestPathTree> = None;
        // path -> count in the first snapshot
        let mut candidates: Option<FxHashMap<Vec<NodeKey>, u64>> = None;
        let mut last_growth: Vec<GrowingNode> = Vec::new();

        let mut snapshots = snapshots
            .into_iter()
            .take(self.config.max_growth_snapshots)
            .peekable();
        while let Some(graph) = snapshots.next() {
            let mut tree = self.build_tree(&graph)?;
            drop(graph);
            report.snapshots_analyzed += 1;

            let Some(before) = previous.as_ref() else {
                previous = Some(tree);
                continue;
            };

            let growing = tree.diff(before);
            let mut next_candidates = FxHashMap::default();
            last_growth.clear();
            for id in growing {
                let path = tree.path(id);
                let node = tree.get(id);
                let first_count = match &candidates {
                    None => node.self_object_count - node.self_object_count_increase,
                    Some(existing) => match existing.get(&path) {
                        Some(&count) => count,
                        None => continue,
                    },
                };
                last_growth.push(GrowingNode {
                    path: path.clone(),
                    self_object_count: node.self_object_count,
                    self_object_count_increase: node.self_object_count_increase,
                    total_increase: node.self_object_count - first_count,
                });
                next_candidates.insert(path, first_count);
            }

            debug!(
                snapshot = report.snapshots_analyzed,
                nodes = tree.len(),
                growing = next_candidates.len(),
                "Snapshot diffed"
            );

            if next_candidates.is_empty() {
                // Only an exit if snapshots were left unread
                report.early_exit = snapshots.peek().is_some();
                last_growth.clear();
                break;
            }
            candidates = Some(next_candidates);
            previous = Some(tree);
        }

        if candidates.is_some() {
            report.growing_nodes = last_growth;
        }
        info!(
            snapshots = report.snapshots_analyzed,
            growing = report.growing_nodes.len(),
            early_exit = report.early_exit,
            duration_ms = started.elapsed().as_millis() as u64,
            "Growth detection complete"
        );
        Ok(report)
    }

    /// Shortest-path tree over every object reachable in `graph`
    pub fn build_tree(&self, graph: &HeapGraph) -> Result<ShortestPathTree> {
        let mut resolver = ReferenceResolver::new(graph, &self.matchers);
        let mut tree = ShortestPathTree::new();
        let mut visited = LongScatterSet::with_expected_elements(graph.object_count());
        let mut queue = VecDeque::new();

        for root in sorted_roots(graph) {
            let object_id = root.object_id();
            if !graph.contains(object_id) || visited.contains(object_id) {
                continue;
            }
            let matched = resolver.match_root(&root)?;
            if matched.is_some_and(|m| m.verdict.is_always_ignore()) {
                continue;
            }
            visited.add(object_id);
            let key = NodeKey::new(root.kind().as_str(), class_name(graph, object_id));
            let node = tree.add_object(tree.root(), key, object_id)?;
            queue.push_back((object_id, node));
        }

        while let Some((object_id, node)) = queue.pop_front() {
            let object = graph.object(object_id)?;
            for edge in resolver.expand(&object) {
                let target = edge.reference.target_id;
                if !visited.add(target) {
                    continue;
                }
                let edge_name = match edge.reference.kind {
                    ReferenceKind::ArrayEntry => edges::ARRAY_ELEMENT.to_string(),
                    ReferenceKind::InstanceField | ReferenceKind::StaticField => {
                        edge.reference.name.to_string()
                    }
                };
                let child = tree.add_object(node, NodeKey::new(edge_name, class_name(graph, target)), target)?;
                queue.push_back((target, child));
            }
        }

        Ok(tree)
    }
}

fn class_name(graph: &HeapGraph, object_id: u64) -> String {
    graph
        .class_name_of(object_id)
        .unwrap_or_else(|| UNKNOWN_CLASS.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::hprof::{GcRoot, GcRootKind, HeapDumpBuilder, HeapValue};

    /// Holder.items -> Item[] with `count` items
    fn snapshot(count: usize) -> HeapGraph {
        let mut builder = HeapDumpBuilder::new();
        let holder = builder.class("com.example.Holder", &[]);
        let item = builder.class("com.example.Item", &[]);
        let items: Vec<u64> = (0..count).map(|_| builder.instance(item, &[])).collect();
        let array = builder.object_array("com.example.Item", &items);
        builder.static_field(holder, "items", HeapValue::Object(array)).unwrap();
        builder.root(GcRoot::StickyClass { id: holder });
        HeapGraph::open(Box::new(builder.build_source().unwrap()), &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_tree_collapses_array_entries() {
        let detector = HeapGrowthDetector::new(&[]).unwrap();
        let tree = detector.build_tree(&snapshot(3)).unwrap();
        let path = [
            NodeKey::new(GcRootKind::StickyClass.as_str(), "com.example.Holder"),
            NodeKey::new("items", "com.example.Item[]"),
            NodeKey::new("[]", "com.example.Item"),
        ];
        let id = tree.find(&path).unwrap();
        assert_eq!(tree.get(id).self_object_count, 3);
    }

    #[test]
    fn test_monotonic_growth_reported() {
        let detector = HeapGrowthDetector::new(&[]).unwrap();
        let report = detector
            .find_growing_objects((1..=5).map(snapshot))
            .unwrap();
        assert_eq!(report.snapshots_analyzed, 5);
        assert!(!report.early_exit);
        assert_eq!(report.growing_nodes.len(), 1);
        let node = &report.growing_nodes[0];
        assert_eq!(node.self_object_count, 5);
        assert_eq!(node.self_object_count_increase, 1);
        assert_eq!(node.total_increase, 4);
    }

    #[test]
    fn test_growth_that_stops_is_dropped() {
        let detector = HeapGrowthDetector::new(&[]).unwrap();
        let report = detector
            .find_growing_objects([1, 2, 3, 3, 3].into_iter().map(snapshot))
            .unwrap();
        assert!(report.growing_nodes.is_empty());
        assert!(report.early_exit);
        assert_eq!(report.snapshots_analyzed, 4);
    }

    #[test]
    fn test_growth_stopping_on_last_snapshot_is_not_early_exit() {
        let detector = HeapGrowthDetector::new(&[]).unwrap();
        let report = detector
            .find_growing_objects([1, 2, 3, 3].into_iter().map(snapshot))
            .unwrap();
        assert!(report.growing_nodes.is_empty());
        assert!(!report.early_exit);
        assert_eq!(report.snapshots_analyzed, 4);
    }

    #[test]
    fn test_snapshot_limit_honored() {
        let detector = HeapGrowthDetector::new(&[])
            .unwrap()
            .with_config(AnalysisConfig::default().max_growth_snapshots(3));
        let report = detector.find_growing_objects((1..=5).map(snapshot)).unwrap();
        assert_eq!(report.snapshots_analyzed, 3);
        assert_eq!(report.growing_nodes[0].total_increase, 2);
    }

    #[test]
    fn test_single_snapshot_has_no_growth() {
        let detector = HeapGrowthDetector::new(&[]).unwrap();
        let report = detector.find_growing_objects(std::iter::once(snapshot(2))).unwrap();
        assert_eq!(report.snapshots_analyzed, 1);
        assert!(!report.is_growing());
    }
}
