//! Orchestrates one heap analysis end to end

use super::trace_builder::{LeakGroups, LeakTraceBuilder};
use crate::config::AnalysisConfig;
use crate::errors::Result;
use crate::features::analysis::domain::{
    AnalysisFailure, AnalysisMetadata, AnalysisResult, AnalysisStep, AnalysisSuccess,
    ObfuscationMapping, UnreachableObject,
};
use crate::features::analysis::ports::{
    LeakingObjectFinder, ObjectClassifier, OnAnalysisProgressListener,
};
use crate::features::dominators::DominatorTree;
use crate::features::heap_graph::HeapGraph;
use crate::features::hprof::SnapshotSource;
use crate::features::leak_finder::ShortestPathFinder;
use crate::features::reference_matchers::{default_jdk_matchers, MatcherIndex, ReferenceMatcher};
use chrono::{TimeZone, Utc};
use std::time::Instant;
use tracing::{info, warn, Dispatch};

/// Heap analysis entry point
///
/// Indexes the snapshot, asks the finder for leaking objects, finds their
/// shortest paths from GC roots, optionally computes retained sizes, then
/// builds and groups leak traces.
///
/// # Example
///
/// ```no_run
/// use leakgraph_core::features::analysis::{HeapAnalyzer, KeyedReferenceFinder};
/// use leakgraph_core::features::hprof::FileSnapshotSource;
/// use leakgraph_core::features::reference_matchers::default_jdk_matchers;
///
/// let source = FileSnapshotSource::open("app.hprof")?;
/// let result = HeapAnalyzer::new().analyze(
///     Box::new(source),
///     &KeyedReferenceFinder::new(),
///     &default_jdk_matchers(),
///     true,
///     &[],
/// );
/// println!("{}", serde_json::to_string_pretty(&result)?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct HeapAnalyzer {
    config: AnalysisConfig,
    log_dispatch: Dispatch,
    progress_listener: Option<Box<dyn OnAnalysisProgressListener>>,
    obfuscation_mapping: Option<ObfuscationMapping>,
}

impl Default for HeapAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HeapAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapAnalyzer")
            .field("config", &self.config)
            .field("progress_listener", &self.progress_listener.is_some())
            .field("obfuscation_mapping", &self.obfuscation_mapping.is_some())
            .finish()
    }
}

impl HeapAnalyzer {
    /// Default configuration, no logging, no listener
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            log_dispatch: Dispatch::none(),
            progress_listener: None,
            obfuscation_mapping: None,
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Route this analyzer's events to `dispatch` instead of discarding them
    pub fn with_log_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.log_dispatch = dispatch;
        self
    }

    pub fn with_progress_listener(mut self, listener: impl OnAnalysisProgressListener + 'static) -> Self {
        self.progress_listener = Some(Box::new(listener));
        self
    }

    pub fn with_obfuscation_mapping(mut self, mapping: ObfuscationMapping) -> Self {
        self.obfuscation_mapping = Some(mapping);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze the snapshot behind `source`
    ///
    /// Never fails: any error becomes [`AnalysisResult::Failure`]. The source
    /// is dropped before returning on every path.
    pub fn analyze(
        &self,
        source: Box<dyn SnapshotSource>,
        leaking_object_finder: &dyn LeakingObjectFinder,
        reference_matchers: &[ReferenceMatcher],
        compute_retained_size: bool,
        object_classifiers: &[Box<dyn ObjectClassifier>],
    ) -> AnalysisResult {
        let started = Instant::now();
        tracing::dispatcher::with_default(&self.log_dispatch, || {
            let outcome = self.open_graph(source).and_then(|graph| {
                self.analyze_graph(
                    &graph,
                    leaking_object_finder,
                    reference_matchers,
                    compute_retained_size,
                    object_classifiers,
                )
            });
            match outcome {
                Ok(mut success) => {
                    success.analysis_duration = started.elapsed();
                    info!(
                        application_leaks = success.application_leaks.len(),
                        library_leaks = success.library_leaks.len(),
                        unreachable = success.unreachable_objects.len(),
                        duration_ms = success.analysis_duration.as_millis() as u64,
                        "Analysis complete"
                    );
                    AnalysisResult::Success(success)
                }
                Err(e) => {
                    warn!(error = %e, "Analysis failed");
                    AnalysisResult::Failure(AnalysisFailure {
                        exception_description: e.to_string(),
                        analysis_duration: started.elapsed(),
                    })
                }
            }
        })
    }

    /// [`analyze`](Self::analyze) with the JDK matchers, no classifiers, and
    /// retained sizes as configured
    pub fn analyze_with_defaults(
        &self,
        source: Box<dyn SnapshotSource>,
        leaking_object_finder: &dyn LeakingObjectFinder,
    ) -> AnalysisResult {
        self.analyze(
            source,
            leaking_object_finder,
            &default_jdk_matchers(),
            self.config.compute_retained_size,
            &[],
        )
    }

    /// Run every stage after indexing against an existing graph
    ///
    /// Errors propagate; only [`analyze`](Self::analyze) turns them into a
    /// failure value.
    pub fn analyze_graph(
        &self,
        graph: &HeapGraph,
        leaking_object_finder: &dyn LeakingObjectFinder,
        reference_matchers: &[ReferenceMatcher],
        compute_retained_size: bool,
        object_classifiers: &[Box<dyn ObjectClassifier>],
    ) -> Result<AnalysisSuccess> {
        let started = Instant::now();

        self.progress(AnalysisStep::FindingLeakingInstances);
        let leaking = leaking_object_finder.find_leaking_object_ids(graph)?;
        info!(leaking = leaking.size(), "Leaking objects found");

        self.progress(AnalysisStep::FindingPathsToRetainedObjects);
        let matchers = MatcherIndex::new(reference_matchers)?;
        let paths = ShortestPathFinder::new(graph, &matchers).find_paths(&leaking)?;

        let dominators = if compute_retained_size && !paths.found.is_empty() {
            self.progress(AnalysisStep::FindingDominators);
            let tree = DominatorTree::compute(graph, &matchers)?;
            self.progress(AnalysisStep::ComputingRetainedSize);
            Some(tree)
        } else {
            None
        };

        self.progress(AnalysisStep::BuildingLeakTraces);
        let builder = LeakTraceBuilder::new(graph, object_classifiers)
            .with_mapping(self.obfuscation_mapping.as_ref())
            .with_dominators(dominators.as_ref());
        let mut groups = LeakGroups::new();
        for found in &paths.found {
            let (trace, library_matcher) = builder.build(&paths, found);
            groups.add(trace, library_matcher);
        }
        let (application_leaks, library_leaks) = groups.into_parts();

        let unreachable_objects = paths
            .not_found
            .iter()
            .map(|&object_id| UnreachableObject {
                object_id,
                class_name: graph
                    .class_name_of(object_id)
                    .map(|name| match &self.obfuscation_mapping {
                        Some(mapping) => mapping.deobfuscate_class(&name),
                        None => name,
                    })
                    .unwrap_or_else(|| "unknown".to_string()),
            })
            .collect();

        let header = graph.index().header();
        let metadata = AnalysisMetadata {
            snapshot: graph.description(),
            heap_dump_timestamp: Utc.timestamp_millis_opt(header.timestamp_millis as i64).single(),
            identifier_size: header.identifier_size.bytes(),
            object_counts: graph.index().counts(),
            gc_root_count: graph.gc_roots().len(),
            leaking_object_count: leaking.size(),
            missing_reference_targets: paths.missing_targets,
            source_stats: graph.source_stats(),
            analyzed_at: Utc::now(),
        };

        Ok(AnalysisSuccess {
            application_leaks,
            library_leaks,
            unreachable_objects,
            analysis_duration: started.elapsed(),
            metadata,
        })
    }

    fn open_graph(&self, source: Box<dyn SnapshotSource>) -> Result<HeapGraph> {
        self.progress(AnalysisStep::ParsingHeapDump);
        info!(source = %source.description(), len = source.len(), "Indexing heap dump");
        HeapGraph::open(source, &self.config)
    }

    fn progress(&self, step: AnalysisStep) {
        if let Some(listener) = &self.progress_listener {
            listener.on_analysis_progress(step);
        }
    }
}
