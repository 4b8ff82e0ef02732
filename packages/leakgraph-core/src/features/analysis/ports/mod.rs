//! Analysis ports
//!
//! Seams where callers plug behavior into [`HeapAnalyzer`](super::HeapAnalyzer):
//! which objects count as leaking, how trace elements are labeled, and who
//! hears about progress. Plain closures implement the finder and listener
//! traits.

use super::domain::{AnalysisStep, Verdict};
use crate::errors::Result;
use crate::features::heap_graph::HeapGraph;
use crate::features::leak_finder::LeakNode;
use crate::shared::collections::LongScatterSet;

/// Supplies the ids of objects that should have been collected
pub trait LeakingObjectFinder {
    fn find_leaking_object_ids(&self, graph: &HeapGraph) -> Result<LongScatterSet>;
}

impl<F> LeakingObjectFinder for F
where
    F: Fn(&HeapGraph) -> Result<LongScatterSet>,
{
    fn find_leaking_object_ids(&self, graph: &HeapGraph) -> Result<LongScatterSet> {
        self(graph)
    }
}

/// Labels objects on a leak trace
///
/// Implementations must be pure: the same graph and node give the same
/// answer.
pub trait ObjectClassifier: Send + Sync {
    fn classify(&self, graph: &HeapGraph, node: &LeakNode) -> Verdict;

    /// Free-form lines shown under the element
    fn labels(&self, _graph: &HeapGraph, _node: &LeakNode) -> Vec<String> {
        Vec::new()
    }
}

/// Observes stage boundaries; cannot influence the analysis
pub trait OnAnalysisProgressListener {
    fn on_analysis_progress(&self, step: AnalysisStep);
}

impl<F> OnAnalysisProgressListener for F
where
    F: Fn(AnalysisStep),
{
    fn on_analysis_progress(&self, step: AnalysisStep) {
        self(step)
    }
}
