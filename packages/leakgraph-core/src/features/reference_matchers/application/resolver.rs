//! Applies a [`MatcherIndex`] to references enumerated from a heap graph
//!
//! Shared by every traversal that walks the heap from its roots: the
//! shortest-path finder, the dominator builder and the growth detector.

use super::index::{strongest_arc, MatcherIndex};
use crate::errors::Result;
use crate::features::heap_graph::{HeapGraph, HeapObject, HeapReference, ReferenceKind};
use crate::features::hprof::GcRoot;
use crate::features::reference_matchers::domain::{ReferenceMatcher, ReferencePattern};
use rustc_hash::FxHashMap;
use std::sync::Arc;

type FieldMatchers = FxHashMap<String, Arc<ReferenceMatcher>>;

/// A followable reference and the matcher it hit, if any
#[derive(Debug, Clone)]
pub struct MatchedReference {
    pub reference: HeapReference,
    /// Never `AlwaysIgnore`; such edges are dropped
    pub matcher: Option<Arc<ReferenceMatcher>>,
}

/// Per-traversal matcher resolution with per-class caches
pub struct ReferenceResolver<'g> {
    graph: &'g HeapGraph,
    matchers: &'g MatcherIndex,
    /// Instance-field matchers merged over each class's hierarchy
    field_matchers: FxHashMap<u64, Arc<FieldMatchers>>,
    /// Type matchers whose holder class is in each class's hierarchy
    type_matchers: FxHashMap<u64, Arc<Vec<Arc<ReferenceMatcher>>>>,
    missing_targets: u64,
}

impl<'g> ReferenceResolver<'g> {
    pub fn new(graph: &'g HeapGraph, matchers: &'g MatcherIndex) -> Self {
        Self {
            graph,
            matchers,
            field_matchers: FxHashMap::default(),
            type_matchers: FxHashMap::default(),
            missing_targets: 0,
        }
    }

    pub fn graph(&self) -> &'g HeapGraph {
        self.graph
    }

    /// References skipped so far because their target is not in the index
    pub fn missing_targets(&self) -> u64 {
        self.missing_targets
    }

    /// Outgoing references worth following, in enumeration order
    ///
    /// Drops targets absent from the index and `AlwaysIgnore` matches.
    pub fn expand(&mut self, object: &HeapObject) -> Vec<MatchedReference> {
        let references = self.graph.references(object);
        let mut expanded = Vec::with_capacity(references.len());
        for reference in references {
            if !self.graph.contains(reference.target_id) {
                self.missing_targets += 1;
                continue;
            }
            let matcher = self.match_reference(object, &reference);
            if matcher.as_ref().is_some_and(|m| m.verdict.is_always_ignore()) {
                continue;
            }
            expanded.push(MatchedReference { reference, matcher });
        }
        expanded
    }

    /// Matcher applying to `reference` out of `holder`
    ///
    /// Field-name matches take precedence over type matches; ties go to
    /// [`ReferenceMatcher::strongest`].
    pub fn match_reference(
        &mut self,
        holder: &HeapObject,
        reference: &HeapReference,
    ) -> Option<Arc<ReferenceMatcher>> {
        match (holder, reference.kind) {
            (HeapObject::Class(class), ReferenceKind::StaticField) => {
                let field_name = reference.field_name()?;
                if let Some(matcher) = self.matchers.static_field(&class.name, field_name) {
                    return Some(Arc::clone(matcher));
                }
                let field_types = self.matchers.field_type_matchers();
                if field_types.is_empty() {
                    return None;
                }
                let candidates: Vec<Arc<ReferenceMatcher>> = field_types
                    .iter()
                    .filter(|m| matches!(&m.pattern, ReferencePattern::FieldOfType { class_name, .. } if *class_name == class.name))
                    .cloned()
                    .collect();
                self.strongest_type_match(&candidates, reference.target_id)
            }
            (HeapObject::Instance(instance), ReferenceKind::InstanceField) => {
                let field_name = reference.field_name()?;
                if self.matchers.has_instance_field_matchers() {
                    let fields = self.field_matchers_for(instance.class_id);
                    if let Some(matcher) = fields.get(field_name) {
                        return Some(Arc::clone(matcher));
                    }
                }
                if self.matchers.field_type_matchers().is_empty() {
                    return None;
                }
                let candidates = self.type_matchers_for(instance.class_id);
                self.strongest_type_match(&candidates, reference.target_id)
            }
            _ => None,
        }
    }

    /// Matcher applying to a GC root: thread name for Java-frame locals,
    /// referent class for JNI globals
    pub fn match_root(&self, root: &GcRoot) -> Result<Option<Arc<ReferenceMatcher>>> {
        match root {
            GcRoot::JavaFrame { thread_serial, .. } if self.matchers.has_thread_matchers() => {
                let thread_id = match self.graph.index().thread_object_id(*thread_serial) {
                    Some(id) => id,
                    None => return Ok(None),
                };
                Ok(self
                    .graph
                    .thread_name(thread_id)?
                    .and_then(|name| self.matchers.thread_matcher(&name).cloned()))
            }
            GcRoot::JniGlobal { id, .. } => Ok(self
                .matchers
                .native_global_matchers()
                .iter()
                .filter(|m| match &m.pattern {
                    ReferencePattern::NativeGlobalVariable { class_name } => {
                        self.graph.is_instance_of(*id, class_name)
                            || self.graph.class_name(*id) == Some(class_name.as_str())
                    }
                    _ => false,
                })
                .reduce(|a, b| strongest_arc(a, b))
                .cloned()),
            _ => Ok(None),
        }
    }

    fn field_matchers_for(&mut self, class_id: u64) -> Arc<FieldMatchers> {
        if let Some(cached) = self.field_matchers.get(&class_id) {
            return Arc::clone(cached);
        }
        let mut merged: FieldMatchers = FxHashMap::default();
        for class_name in self.graph.class_hierarchy(class_id) {
            let Some(fields) = self.matchers.instance_fields_of(&class_name) else {
                continue;
            };
            for (field_name, matcher) in fields {
                let keep = match merged.get(field_name) {
                    Some(existing) => Arc::clone(strongest_arc(existing, matcher)),
                    None => Arc::clone(matcher),
                };
                merged.insert(field_name.clone(), keep);
            }
        }
        let merged = Arc::new(merged);
        self.field_matchers.insert(class_id, Arc::clone(&merged));
        merged
    }

    fn type_matchers_for(&mut self, class_id: u64) -> Arc<Vec<Arc<ReferenceMatcher>>> {
        if let Some(cached) = self.type_matchers.get(&class_id) {
            return Arc::clone(cached);
        }
        let hierarchy = self.graph.class_hierarchy(class_id);
        let applicable: Vec<Arc<ReferenceMatcher>> = self
            .matchers
            .field_type_matchers()
            .iter()
            .filter(|m| match &m.pattern {
                ReferencePattern::FieldOfType { class_name, .. } => hierarchy.contains(class_name),
                _ => false,
            })
            .cloned()
            .collect();
        let applicable = Arc::new(applicable);
        self.type_matchers.insert(class_id, Arc::clone(&applicable));
        applicable
    }

    fn strongest_type_match(
        &self,
        candidates: &[Arc<ReferenceMatcher>],
        target_id: u64,
    ) -> Option<Arc<ReferenceMatcher>> {
        if candidates.is_empty() {
            return None;
        }
        let target_hierarchy = self.graph.object_class_hierarchy(target_id);
        candidates
            .iter()
            .filter(|m| match &m.pattern {
                ReferencePattern::FieldOfType { field_type, .. } => target_hierarchy.contains(field_type),
                _ => false,
            })
            .reduce(|a, b| strongest_arc(a, b))
            .cloned()
    }
}

/// GC roots in traversal order: thread objects first, then the remaining
/// kinds in a fixed order, then by object id
pub fn sorted_roots(graph: &HeapGraph) -> Vec<GcRoot> {
    let mut roots = graph.gc_roots().to_vec();
    roots.sort_by_key(|root| (root.kind(), root.object_id()));
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::features::hprof::{FieldType, HeapDumpBuilder, HeapValue};

    fn graph(builder: &HeapDumpBuilder) -> HeapGraph {
        HeapGraph::open(Box::new(builder.build_source().unwrap()), &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_instance_field_matcher_applies_to_subclasses() {
        let mut builder = HeapDumpBuilder::new();
        let base = builder.class("com.example.Base", &[("listener", FieldType::Object)]);
        let derived = builder.class_with_superclass("com.example.Derived", base, &[]);
        let target = builder.instance(base, &[]);
        let holder = builder.instance(derived, &[("listener", HeapValue::Object(target))]);
        let graph = graph(&builder);
        let index = MatcherIndex::new(&[ReferenceMatcher::library_leak(
            ReferencePattern::instance_field("com.example.Base", "listener"),
            "framework keeps listeners",
        )])
        .unwrap();

        let mut resolver = ReferenceResolver::new(&graph, &index);
        let holder = graph.object(holder).unwrap();
        let expanded = resolver.expand(&holder);
        assert_eq!(expanded.len(), 1);
        let matcher = expanded[0].matcher.as_ref().unwrap();
        assert_eq!(matcher.verdict.library_leak_description(), Some("framework keeps listeners"));
    }

    #[test]
    fn test_ignored_and_missing_edges_are_dropped() {
        let mut builder = HeapDumpBuilder::new();
        let node = builder.class("com.example.Node", &[("a", FieldType::Object), ("b", FieldType::Object)]);
        let dangling = builder.reserve_id();
        let target = builder.instance(node, &[]);
        let holder = builder.instance(
            node,
            &[("a", HeapValue::Object(target)), ("b", HeapValue::Object(dangling))],
        );
        let graph = graph(&builder);
        let index =
            MatcherIndex::new(&[ReferenceMatcher::ignored(ReferencePattern::instance_field("com.example.Node", "a"))])
                .unwrap();

        let mut resolver = ReferenceResolver::new(&graph, &index);
        assert!(resolver.expand(&graph.object(holder).unwrap()).is_empty());
        assert_eq!(resolver.missing_targets(), 1);
    }

    #[test]
    fn test_field_name_beats_type_match() {
        let mut builder = HeapDumpBuilder::new();
        let target_class = builder.class("com.example.Context", &[]);
        let holder_class = builder.class("com.example.Holder", &[("context", FieldType::Object)]);
        let target = builder.instance(target_class, &[]);
        let holder = builder.instance(holder_class, &[("context", HeapValue::Object(target))]);
        let graph = graph(&builder);
        let by_type =
            ReferenceMatcher::ignored(ReferencePattern::field_of_type("com.example.Holder", "com.example.Context"));
        let by_name = ReferenceMatcher::library_leak(
            ReferencePattern::instance_field("com.example.Holder", "context"),
            "held context",
        );
        let index = MatcherIndex::new(&[by_type.clone(), by_name.clone()]).unwrap();

        let mut resolver = ReferenceResolver::new(&graph, &index);
        let holder = graph.object(holder).unwrap();
        let reference = graph.references(&holder).remove(0);
        assert_eq!(*resolver.match_reference(&holder, &reference).unwrap(), by_name);

        let type_only = MatcherIndex::new(&[by_type.clone()]).unwrap();
        let mut resolver = ReferenceResolver::new(&graph, &type_only);
        assert_eq!(*resolver.match_reference(&holder, &reference).unwrap(), by_type);
    }

    #[test]
    fn test_thread_matcher_tags_java_frame_roots() {
        let mut builder = HeapDumpBuilder::new();
        let (_, serial) = builder.thread("worker-1");
        let class = builder.class("com.example.Local", &[]);
        let local = builder.instance(class, &[]);
        builder.root(GcRoot::JavaFrame {
            id: local,
            thread_serial: serial,
            frame_number: 0,
        });
        let graph = graph(&builder);
        let index = MatcherIndex::new(&[ReferenceMatcher::ignored_unless_reachable_from_leak(
            ReferencePattern::thread("^worker-"),
        )])
        .unwrap();

        let resolver = ReferenceResolver::new(&graph, &index);
        let root = sorted_roots(&graph)
            .into_iter()
            .find(|r| r.object_id() == local)
            .unwrap();
        assert!(resolver.match_root(&root).unwrap().is_some());
    }

    #[test]
    fn test_roots_sort_thread_objects_first() {
        let mut builder = HeapDumpBuilder::new();
        let class = builder.class("com.example.Rooted", &[]);
        let a = builder.instance(class, &[]);
        builder.root(GcRoot::StickyClass { id: class });
        builder.root(GcRoot::Unknown { id: a });
        let (thread, _) = builder.thread("main");
        let graph = graph(&builder);

        let kinds: Vec<u64> = sorted_roots(&graph).iter().map(|r| r.object_id()).collect();
        assert_eq!(kinds, vec![thread, class, a]);
    }
}
