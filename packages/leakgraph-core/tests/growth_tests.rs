//! Repeated-snapshot growth detection tests

mod common;

use common::*;
use leakgraph_core::config::AnalysisConfig;
use leakgraph_core::features::growth::{HeapGrowthDetector, NodeKey};
use leakgraph_core::features::hprof::GcRootKind;
use pretty_assertions::assert_eq;

#[test]
fn test_list_growing_every_iteration() {
    let detector = HeapGrowthDetector::new(&[]).unwrap();
    let report = detector
        .find_growing_objects((1..=5).map(|n| graph_of(&growing_list(n))))
        .unwrap();

    assert_eq!(report.snapshots_analyzed, 5);
    assert_eq!(report.growing_nodes.len(), 1);
    let node = &report.growing_nodes[0];
    assert_eq!(
        node.path,
        vec![
            NodeKey::new(GcRootKind::StickyClass.as_str(), "com.example.Holder"),
            NodeKey::new("items", "com.example.Item[]"),
            NodeKey::new("[]", "com.example.Item"),
        ]
    );
    assert_eq!(node.self_object_count_increase, 1);
    assert_eq!(node.total_increase, 4);
}

#[test]
fn test_two_allocations_per_iteration() {
    let detector = HeapGrowthDetector::new(&[]).unwrap();
    let report = detector
        .find_growing_objects([2, 4, 6].into_iter().map(|n| graph_of(&growing_list(n))))
        .unwrap();
    assert_eq!(report.growing_nodes[0].self_object_count_increase, 2);
    assert_eq!(report.growing_nodes[0].self_object_count, 6);
}

#[test]
fn test_growth_stopping_after_third_snapshot() {
    let detector = HeapGrowthDetector::new(&[]).unwrap();
    let report = detector
        .find_growing_objects([1, 2, 3, 3, 3].into_iter().map(|n| graph_of(&growing_list(n))))
        .unwrap();
    assert!(!report.is_growing());
    assert!(report.early_exit);
}

#[test]
fn test_transient_growth_is_filtered() {
    let detector = HeapGrowthDetector::new(&[]).unwrap();
    let report = detector
        .find_growing_objects([1, 3, 2, 4].into_iter().map(|n| graph_of(&growing_list(n))))
        .unwrap();
    assert!(!report.is_growing());
}

#[test]
fn test_invalid_config_rejected() {
    let detector = HeapGrowthDetector::new(&[])
        .unwrap()
        .with_config(AnalysisConfig::default().max_growth_snapshots(1));
    let err = detector
        .find_growing_objects(std::iter::empty())
        .unwrap_err();
    assert!(err.to_string().contains("max_growth_snapshots"));
}
