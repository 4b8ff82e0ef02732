//! Error types for leakgraph-core
//!
//! Provides unified error handling across the crate. Internal stages return
//! [`Result`] and propagate with `?`; only the analysis orchestrator turns an
//! error into an [`AnalysisFailure`](crate::features::analysis::AnalysisFailure) value.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for leakgraph-core operations
#[derive(Debug, Error)]
pub enum LeakgraphError {
    /// IO error from the snapshot source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed record, truncated stream or unsupported identifier width
    #[error("Parse error at byte offset {offset}: {message}")]
    Parse { offset: u64, message: String },

    /// An object id has no index entry
    #[error("Object not found: 0x{object_id:x}")]
    ObjectNotFound { object_id: u64 },

    /// Indexing and traversal disagree about the object graph
    #[error("Graph integrity error during {stage} for object 0x{object_id:x}")]
    GraphIntegrity { object_id: u64, stage: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The pluggable leaking object finder failed
    #[error("Leaking object finder error: {0}")]
    Finder(String),
}

impl LeakgraphError {
    /// Create a parse error at an absolute byte offset
    pub fn parse(offset: u64, message: impl Into<String>) -> Self {
        LeakgraphError::Parse {
            offset,
            message: message.into(),
        }
    }

    /// Create an object-not-found error
    pub fn object_not_found(object_id: u64) -> Self {
        LeakgraphError::ObjectNotFound { object_id }
    }

    /// Create a graph integrity error
    pub fn graph_integrity(object_id: u64, stage: impl Into<String>) -> Self {
        LeakgraphError::GraphIntegrity {
            object_id,
            stage: stage.into(),
        }
    }

    /// Create a finder error
    pub fn finder(msg: impl Into<String>) -> Self {
        LeakgraphError::Finder(msg.into())
    }

    /// Byte offset for parse errors
    pub fn offset(&self) -> Option<u64> {
        match self {
            LeakgraphError::Parse { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// Result type alias for leakgraph operations
pub type Result<T> = std::result::Result<T, LeakgraphError>;

/// Handle for the next node of a `u32`-indexed arena holding `len` nodes
pub(crate) fn next_node_index(len: usize, object_id: u64, stage: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| LeakgraphError::graph_integrity(object_id, stage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_includes_offset() {
        let err = LeakgraphError::parse(1234, "unknown sub-record tag 0x42");
        let msg = err.to_string();
        assert!(msg.contains("1234"));
        assert!(msg.contains("0x42"));
        assert_eq!(err.offset(), Some(1234));
    }

    #[test]
    fn test_graph_integrity_display() {
        let err = LeakgraphError::graph_integrity(0xbeef, "dominators");
        let msg = err.to_string();
        assert!(msg.contains("dominators"));
        assert!(msg.contains("beef"));
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn test_next_node_index() {
        assert_eq!(next_node_index(7, 1, "leak arena").unwrap(), 7);
        assert_eq!(next_node_index(u32::MAX as usize, 1, "leak arena").unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_next_node_index_rejects_overflow() {
        let err = next_node_index(u32::MAX as usize + 1, 0xabc, "path tree").unwrap_err();
        assert!(matches!(
            err,
            LeakgraphError::GraphIntegrity { object_id: 0xabc, ref stage } if stage == "path tree"
        ));
    }
}
