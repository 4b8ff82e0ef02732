//! Turns BFS paths into leak traces and groups them into leaks

use crate::features::analysis::domain::{
    resolve_status, ApplicationLeak, HolderKind, LeakTrace, LeakTraceElement, LeakTraceReference,
    LibraryLeak, ObfuscationMapping,
};
use crate::features::analysis::ports::ObjectClassifier;
use crate::features::dominators::DominatorTree;
use crate::features::heap_graph::{HeapGraph, HeapReference, ReferenceName};
use crate::features::hprof::{GcRootKind, IndexedObject};
use crate::features::leak_finder::{FoundPath, LeakNode, PathFindingResult};
use crate::features::reference_matchers::{MatcherVerdict, ReferenceMatcher};
use crate::shared::constants::jdk;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Builds [`LeakTrace`]s for one analysis
pub struct LeakTraceBuilder<'a> {
    graph: &'a HeapGraph,
    classifiers: &'a [Box<dyn ObjectClassifier>],
    mapping: Option<&'a ObfuscationMapping>,
    dominators: Option<&'a DominatorTree>,
}

impl<'a> LeakTraceBuilder<'a> {
    pub fn new(graph: &'a HeapGraph, classifiers: &'a [Box<dyn ObjectClassifier>]) -> Self {
        Self {
            graph,
            classifiers,
            mapping: None,
            dominators: None,
        }
    }

    pub fn with_mapping(mut self, mapping: Option<&'a ObfuscationMapping>) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_dominators(mut self, dominators: Option<&'a DominatorTree>) -> Self {
        self.dominators = dominators;
        self
    }

    /// Trace for one found path, plus the library matcher it went through
    pub fn build(
        &self,
        paths: &PathFindingResult,
        found: &FoundPath,
    ) -> (LeakTrace, Option<Arc<ReferenceMatcher>>) {
        let nodes = paths.path(found);
        let gc_root_type = nodes
            .first()
            .and_then(|n| n.gc_root)
            .map(|r| r.kind())
            .unwrap_or(GcRootKind::Unknown);

        let last = nodes.len().saturating_sub(1);
        let elements = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let next_edge = nodes.get(i + 1).and_then(|n| n.incoming_edge.as_ref());
                self.element(node, next_edge, i == last)
            })
            .collect();

        let library_matcher = nodes.iter().find_map(|n| {
            n.matched
                .as_ref()
                .filter(|m| matches!(m.verdict, MatcherVerdict::LibraryLeak { .. }))
                .cloned()
        });

        let trace = LeakTrace {
            gc_root_type,
            elements,
            retained_heap_size: self
                .dominators
                .and_then(|d| d.retained_size(found.leaking_object_id)),
            retained_object_count: self
                .dominators
                .and_then(|d| d.retained_count(found.leaking_object_id)),
        };
        (trace, library_matcher)
    }

    fn element(
        &self,
        node: &LeakNode,
        next_edge: Option<&HeapReference>,
        is_leaking_object: bool,
    ) -> LeakTraceElement {
        let object_id = node.object_id;
        let verdicts: Vec<_> = self
            .classifiers
            .iter()
            .map(|c| c.classify(self.graph, node))
            .collect();
        let labels = self
            .classifiers
            .iter()
            .flat_map(|c| c.labels(self.graph, node))
            .collect();
        let (status, status_reason) = resolve_status(&verdicts, is_leaking_object);

        LeakTraceElement {
            object_id,
            holder: self.holder_kind(object_id),
            class_name: self.class(&self.graph.class_name_of(object_id).unwrap_or_default()),
            class_hierarchy: self
                .graph
                .object_class_hierarchy(object_id)
                .iter()
                .map(|name| self.class(name))
                .collect(),
            reference: next_edge.map(|edge| self.reference(edge)),
            exclusion: node.exclusion.as_deref().cloned(),
            status,
            status_reason,
            labels,
        }
    }

    fn holder_kind(&self, object_id: u64) -> HolderKind {
        match self.graph.index().get(object_id) {
            Some(IndexedObject::Class { .. }) => HolderKind::Class,
            Some(IndexedObject::ObjectArray { .. }) | Some(IndexedObject::PrimitiveArray { .. }) => {
                HolderKind::Array
            }
            Some(IndexedObject::Instance { .. }) if self.graph.is_instance_of(object_id, jdk::THREAD) => {
                HolderKind::Thread
            }
            _ => HolderKind::Object,
        }
    }

    fn reference(&self, edge: &HeapReference) -> LeakTraceReference {
        let name = match (&edge.name, self.mapping) {
            (ReferenceName::Field(field), Some(mapping)) => {
                mapping.deobfuscate_field(&edge.declaring_class_name, field)
            }
            (name, _) => name.to_string(),
        };
        LeakTraceReference {
            kind: edge.kind,
            name,
            owning_class_name: self.class(&edge.declaring_class_name),
        }
    }

    fn class(&self, name: &str) -> String {
        match self.mapping {
            Some(mapping) => mapping.deobfuscate_class(name),
            None => name.to_string(),
        }
    }
}

/// Traces grouped by signature, keeping first-seen order
#[derive(Debug, Default)]
pub struct LeakGroups {
    application: Vec<ApplicationLeak>,
    application_by_signature: FxHashMap<String, usize>,
    library: Vec<LibraryLeak>,
    library_by_signature: FxHashMap<String, usize>,
}

impl LeakGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, trace: LeakTrace, library_matcher: Option<Arc<ReferenceMatcher>>) {
        match library_matcher {
            Some(matcher) => {
                let signature = LibraryLeak::signature_of(&matcher.pattern);
                match self.library_by_signature.get(&signature) {
                    Some(&i) => self.library[i].leak_traces.push(trace),
                    None => {
                        self.library_by_signature.insert(signature.clone(), self.library.len());
                        self.library.push(LibraryLeak {
                            signature,
                            pattern: matcher.pattern.clone(),
                            description: matcher
                                .verdict
                                .library_leak_description()
                                .unwrap_or_default()
                                .to_string(),
                            leak_traces: vec![trace],
                        });
                    }
                }
            }
            None => {
                let signature = trace.signature();
                match self.application_by_signature.get(&signature) {
                    Some(&i) => self.application[i].leak_traces.push(trace),
                    None => {
                        self.application_by_signature
                            .insert(signature.clone(), self.application.len());
                        self.application.push(ApplicationLeak {
                            signature,
                            short_description: trace.short_description(),
                            leak_traces: vec![trace],
                        });
                    }
                }
            }
        }
    }

    pub fn into_parts(self) -> (Vec<ApplicationLeak>, Vec<LibraryLeak>) {
        (self.application, self.library)
    }
}
