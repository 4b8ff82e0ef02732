//! Test data builders

use leakgraph_core::config::AnalysisConfig;
use leakgraph_core::errors::Result;
use leakgraph_core::features::heap_graph::HeapGraph;
use leakgraph_core::features::hprof::{HeapDumpBuilder, InMemorySnapshotSource};
use leakgraph_core::shared::collections::LongScatterSet;

/// Index `builder`'s dump with the default configuration
pub fn graph_of(builder: &HeapDumpBuilder) -> HeapGraph {
    HeapGraph::open(Box::new(source_of(builder)), &AnalysisConfig::default())
        .expect("fixture dump must index")
}

pub fn source_of(builder: &HeapDumpBuilder) -> InMemorySnapshotSource {
    builder.build_source().expect("fixture dump must encode")
}

/// Leaking object finder that returns a fixed set of ids
pub fn fixed_finder(ids: &[u64]) -> impl Fn(&HeapGraph) -> Result<LongScatterSet> {
    let ids = ids.to_vec();
    move |_| Ok(ids.iter().copied().collect())
}
