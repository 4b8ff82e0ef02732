//! Outcome of one analysis

use super::leak::{ApplicationLeak, LibraryLeak, UnreachableObject};
use crate::features::hprof::{ObjectCounts, SourceStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Stage boundaries reported to the progress listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStep {
    ParsingHeapDump,
    FindingLeakingInstances,
    FindingPathsToRetainedObjects,
    FindingDominators,
    ComputingRetainedSize,
    BuildingLeakTraces,
}

impl fmt::Display for AnalysisStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ParsingHeapDump => "parsing heap dump",
            Self::FindingLeakingInstances => "finding leaking instances",
            Self::FindingPathsToRetainedObjects => "finding paths to retained objects",
            Self::FindingDominators => "finding dominators",
            Self::ComputingRetainedSize => "computing retained size",
            Self::BuildingLeakTraces => "building leak traces",
        })
    }
}

/// Facts about the analyzed snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Description of the snapshot source, e.g. its path
    pub snapshot: String,
    pub heap_dump_timestamp: Option<DateTime<Utc>>,
    pub identifier_size: u32,
    pub object_counts: ObjectCounts,
    pub gc_root_count: usize,
    pub leaking_object_count: usize,
    /// References skipped because their target was not in the dump
    pub missing_reference_targets: u64,
    pub source_stats: SourceStats,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSuccess {
    pub application_leaks: Vec<ApplicationLeak>,
    pub library_leaks: Vec<LibraryLeak>,
    pub unreachable_objects: Vec<UnreachableObject>,
    pub analysis_duration: Duration,
    pub metadata: AnalysisMetadata,
}

impl AnalysisSuccess {
    pub fn leak_count(&self) -> usize {
        self.application_leaks.len() + self.library_leaks.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub exception_description: String,
    pub analysis_duration: Duration,
}

/// Returned by value; failures are data, not errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisResult {
    Success(AnalysisSuccess),
    Failure(AnalysisFailure),
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn as_success(&self) -> Option<&AnalysisSuccess> {
        match self {
            Self::Success(success) => Some(success),
            Self::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&AnalysisFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            Self::Success(_) => None,
        }
    }

    pub fn analysis_duration(&self) -> Duration {
        match self {
            Self::Success(s) => s.analysis_duration,
            Self::Failure(f) => f.analysis_duration,
        }
    }
}
