/*
 * Leakgraph Core - Heap Snapshot Leak Analysis
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Primitive hash containers, constants, macros
 * - config/      : Presets + YAML overrides
 * - features/    : Vertical slices (hprof → heap_graph → reference_matchers
 *                  → leak_finder → dominators → analysis, growth)
 *
 * Performance:
 * - One streaming pass to index, positioned reads to hydrate
 * - Flat open-addressing tables, no per-object allocation
 * - Single multi-source BFS for all leaking objects
 */

#![allow(clippy::too_many_arguments)] // analyze() mirrors the public entry point
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared containers and utilities
#[macro_use]
pub mod shared;

/// Analysis configuration (presets, YAML)
pub mod config;

/// Error types
pub mod errors;

/// Feature modules (hprof → analysis)
pub mod features;

// ═══════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{AnalysisConfig, ConfigError, Preset};
pub use errors::{LeakgraphError, Result};
pub use features::analysis::{
    AnalysisResult, AnalysisStep, HeapAnalyzer, KeyedReferenceFinder, LeakingObjectFinder,
    ObjectClassifier, OnAnalysisProgressListener,
};
pub use features::growth::{GrowthReport, HeapGrowthDetector};
pub use features::heap_graph::HeapGraph;
pub use features::hprof::{
    FileSnapshotSource, InMemorySnapshotSource, MmapSnapshotSource, SnapshotSource,
};
pub use features::reference_matchers::{default_jdk_matchers, ReferenceMatcher, ReferencePattern};
pub use shared::collections::{LongObjectScatterMap, LongScatterSet};
