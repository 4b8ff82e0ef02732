//! Heap Analysis Feature
//!
//! Ties the other features together into one call that turns a heap dump
//! into grouped leak traces.
//!
//! # Architecture
//!
//! ```text
//! analysis/
//! ├── domain/          # LeakTrace, leaks, AnalysisResult, verdicts, obfuscation
//! ├── ports/           # LeakingObjectFinder, ObjectClassifier, progress listener
//! ├── application/     # HeapAnalyzer, LeakTraceBuilder, LeakGroups
//! └── infrastructure/  # keyed-reference finder, classifiers, ProGuard reader
//! ```
//!
//! # Pipeline
//!
//! 1. Index the snapshot into a [`HeapGraph`](crate::features::heap_graph::HeapGraph)
//! 2. Ask the finder for leaking object ids
//! 3. Shortest paths from GC roots
//! 4. Dominators and retained sizes (optional)
//! 5. Build traces, group by signature
//!
//! Errors at any stage become [`AnalysisResult::Failure`].

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{HeapAnalyzer, LeakGroups, LeakTraceBuilder};
pub use domain::{
    resolve_status, simple_class_name, AnalysisFailure, AnalysisMetadata, AnalysisResult,
    AnalysisStep, AnalysisSuccess, ApplicationLeak, HolderKind, LeakTrace,
    LeakTraceElement, LeakTraceReference, LeakingStatus, LibraryLeak, ObfuscationMapping,
    UnreachableObject, Verdict,
};
pub use infrastructure::{
    ClassNameClassifier, FilteringLeakingObjectFinder, KeyedReferenceFinder,
    ProguardMappingReader, ThreadNameLabeler,
};
pub use ports::{LeakingObjectFinder, ObjectClassifier, OnAnalysisProgressListener};
