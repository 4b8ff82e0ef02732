//! Leaks grouped by signature

use super::trace::LeakTrace;
use crate::features::reference_matchers::ReferencePattern;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Leak caused by application code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationLeak {
    pub signature: String,
    pub short_description: String,
    pub leak_traces: Vec<LeakTrace>,
}

/// Leak through a reference known to be held by a library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryLeak {
    /// Derived from the pattern, so every trace through it groups together
    pub signature: String,
    pub pattern: ReferencePattern,
    pub description: String,
    pub leak_traces: Vec<LeakTrace>,
}

impl LibraryLeak {
    pub fn signature_of(pattern: &ReferencePattern) -> String {
        format!("{:x}", Sha256::digest(pattern.to_string().as_bytes()))
    }
}

/// Leaking object that no GC root reaches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreachableObject {
    pub object_id: u64,
    pub class_name: String,
}
