//! Retained size and dominator tests

mod common;

use common::*;
use leakgraph_core::features::analysis::HeapAnalyzer;
use leakgraph_core::features::dominators::DominatorTree;
use leakgraph_core::features::hprof::{FieldType, GcRoot, HeapDumpBuilder, HeapValue};
use leakgraph_core::features::reference_matchers::{MatcherIndex, ReferenceMatcher, ReferencePattern};
use pretty_assertions::assert_eq;

#[test]
fn test_diamond_dominators() {
    let Diamond { builder, root, left, right, bottom } = diamond();
    let graph = graph_of(&builder);
    let tree = DominatorTree::compute(&graph, &MatcherIndex::empty()).unwrap();

    assert_eq!(tree.immediate_dominator(root), Some(0));
    assert_eq!(tree.immediate_dominator(left), Some(root));
    assert_eq!(tree.immediate_dominator(right), Some(root));
    assert_eq!(tree.immediate_dominator(bottom), Some(root));

    assert_eq!(tree.retained_size(left), Some(4));
    assert_eq!(tree.retained_size(bottom), Some(4));
    assert_eq!(tree.retained_size(root), Some(20));
    assert_eq!(tree.retained_count(root), Some(4));
    assert_eq!(tree.total_retained_size(), 20);
}

#[test]
fn test_diamond_leak_retains_only_itself() {
    let Diamond { builder, left, .. } = diamond();
    let result = HeapAnalyzer::new().analyze(
        Box::new(source_of(&builder)),
        &fixed_finder(&[left]),
        &[],
        true,
        &[],
    );

    let trace = &assert_success(&result).application_leaks[0].leak_traces[0];
    assert_eq!(trace.retained_heap_size, Some(4));
    assert_eq!(trace.retained_object_count, Some(1));
}

#[test]
fn test_object_shared_by_two_roots_belongs_to_neither() {
    let mut builder = HeapDumpBuilder::new();
    let owner = builder.class("com.example.Owner", &[("shared", FieldType::Object)]);
    let payload = builder.class("com.example.Payload", &[("n", FieldType::Object)]);
    let shared = builder.instance(payload, &[]);
    let a = builder.instance(owner, &[("shared", HeapValue::Object(shared))]);
    let b = builder.instance(owner, &[("shared", HeapValue::Object(shared))]);
    builder.root(GcRoot::Unknown { id: a });
    builder.root(GcRoot::Unknown { id: b });

    let tree = DominatorTree::compute(&graph_of(&builder), &MatcherIndex::empty()).unwrap();
    assert_eq!(tree.immediate_dominator(shared), Some(0));
    assert_eq!(tree.retained_size(a), Some(4));
    assert_eq!(tree.retained_count(a), Some(1));
}

#[test]
fn test_ignored_edges_do_not_retain() {
    let Diamond { builder, root, left, bottom, .. } = diamond();
    let graph = graph_of(&builder);
    let matchers = MatcherIndex::new(&[ReferenceMatcher::ignored(ReferencePattern::instance_field(
        "com.example.Top",
        "right",
    ))])
    .unwrap();
    let tree = DominatorTree::compute(&graph, &matchers).unwrap();

    assert_eq!(tree.immediate_dominator(bottom), Some(left));
    assert_eq!(tree.retained_size(left), Some(8));
    assert_eq!(tree.retained_count(root), Some(3));
}
