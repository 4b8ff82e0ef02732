//! Built-in object classifiers

use crate::features::analysis::domain::Verdict;
use crate::features::analysis::ports::ObjectClassifier;
use crate::features::heap_graph::HeapGraph;
use crate::features::leak_finder::LeakNode;
use crate::shared::constants::jdk;
use tracing::debug;

/// Verdicts from the class hierarchy of the element
///
/// A class matches when it appears anywhere in the object's hierarchy.
#[derive(Debug, Clone, Default)]
pub struct ClassNameClassifier {
    leaking: Vec<(String, String)>,
    not_leaking: Vec<(String, String)>,
}

impl ClassNameClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaking(mut self, class_name: impl Into<String>, reason: impl Into<String>) -> Self {
        self.leaking.push((class_name.into(), reason.into()));
        self
    }

    pub fn not_leaking(mut self, class_name: impl Into<String>, reason: impl Into<String>) -> Self {
        self.not_leaking.push((class_name.into(), reason.into()));
        self
    }
}

impl ObjectClassifier for ClassNameClassifier {
    fn classify(&self, graph: &HeapGraph, node: &LeakNode) -> Verdict {
        let hierarchy = graph.object_class_hierarchy(node.object_id);
        let find = |rules: &[(String, String)]| {
            rules
                .iter()
                .find(|(class_name, _)| hierarchy.contains(class_name))
                .map(|(_, reason)| reason.clone())
        };
        match (find(&self.leaking), find(&self.not_leaking)) {
            (Some(reason), None) => Verdict::Leaking(reason),
            (None, Some(reason)) => Verdict::NotLeaking(reason),
            _ => Verdict::Unknown,
        }
    }
}

/// Labels thread objects with their name
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadNameLabeler;

impl ObjectClassifier for ThreadNameLabeler {
    fn classify(&self, _graph: &HeapGraph, _node: &LeakNode) -> Verdict {
        Verdict::Unknown
    }

    fn labels(&self, graph: &HeapGraph, node: &LeakNode) -> Vec<String> {
        if !graph.is_instance_of(node.object_id, jdk::THREAD) {
            return Vec::new();
        }
        match graph.thread_name(node.object_id) {
            Ok(Some(name)) => vec![format!("Thread name: '{}'", name)],
            Ok(None) => Vec::new(),
            Err(e) => {
                debug!(object_id = node.object_id, error = %e, "Could not read thread name");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::features::hprof::{GcRoot, HeapDumpBuilder};

    fn node(object_id: u64) -> LeakNode {
        LeakNode::root(GcRoot::Unknown { id: object_id }, None)
    }

    #[test]
    fn test_class_name_classifier_matches_superclasses() {
        let mut builder = HeapDumpBuilder::new();
        let base = builder.class("com.example.Screen", &[]);
        let derived = builder.class_with_superclass("com.example.Settings", base, &[]);
        let other = builder.class("com.example.Other", &[]);
        let screen = builder.instance(derived, &[]);
        let unrelated = builder.instance(other, &[]);
        let graph = HeapGraph::open(Box::new(builder.build_source().unwrap()), &AnalysisConfig::default()).unwrap();

        let classifier = ClassNameClassifier::new().leaking("com.example.Screen", "screen destroyed");
        assert_eq!(
            classifier.classify(&graph, &node(screen)),
            Verdict::Leaking("screen destroyed".into())
        );
        assert_eq!(classifier.classify(&graph, &node(unrelated)), Verdict::Unknown);
    }

    #[test]
    fn test_thread_name_labeler() {
        let mut builder = HeapDumpBuilder::new();
        let (thread, _) = builder.thread("worker-3");
        let graph = HeapGraph::open(Box::new(builder.build_source().unwrap()), &AnalysisConfig::default()).unwrap();

        assert_eq!(
            ThreadNameLabeler.labels(&graph, &node(thread)),
            vec!["Thread name: 'worker-3'".to_string()]
        );
    }
}
