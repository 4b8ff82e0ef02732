//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! Each feature contains (as needed):
//! - domain/         - Pure models
//! - ports/          - Interface definitions (traits)
//! - application/    - Use cases
//! - infrastructure/ - Parsers, sources, built-in implementations
//!
//! Dependency order: hprof → heap_graph → reference_matchers → leak_finder
//! → dominators → analysis. growth reuses heap_graph and reference_matchers.

// Streaming HPROF indexer and snapshot sources
pub mod hprof;

// Lazy object graph over an index
pub mod heap_graph;

// Reference patterns and their verdicts
pub mod reference_matchers;

// Two-queue BFS from GC roots to leaking objects
pub mod leak_finder;

// Dominator tree and retained sizes (petgraph)
pub mod dominators;

// HeapAnalyzer orchestration, leak traces, classifiers
pub mod analysis;

// Repeated-snapshot growth detection
pub mod growth;
