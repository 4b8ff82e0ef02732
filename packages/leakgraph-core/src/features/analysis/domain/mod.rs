//! Analysis domain models

pub mod leak;
pub mod obfuscation;
pub mod result;
pub mod trace;
pub mod verdict;

pub use leak::{ApplicationLeak, LibraryLeak, UnreachableObject};
pub use obfuscation::ObfuscationMapping;
pub use result::{AnalysisFailure, AnalysisMetadata, AnalysisResult, AnalysisStep, AnalysisSuccess};
pub use trace::{
    simple_class_name, HolderKind, LeakTrace, LeakTraceElement, LeakTraceReference, LeakingStatus,
};
pub use verdict::{resolve_status, Verdict};
