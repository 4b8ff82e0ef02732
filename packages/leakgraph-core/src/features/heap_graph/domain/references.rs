//! Outgoing references between heap objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How the holder references the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    InstanceField,
    StaticField,
    ArrayEntry,
}

/// Field name or array index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceName {
    Field(Arc<str>),
    Index(u32),
}

impl fmt::Display for ReferenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Non-null reference from a holder object to `target_id`
///
/// The target may be absent from the index; callers decide whether to
/// follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapReference {
    pub kind: ReferenceKind,
    pub name: ReferenceName,
    /// Class declaring the field; the array class for array entries
    pub declaring_class_id: u64,
    pub declaring_class_name: Arc<str>,
    pub target_id: u64,
}

impl HeapReference {
    pub fn field_name(&self) -> Option<&str> {
        match &self.name {
            ReferenceName::Field(name) => Some(name),
            ReferenceName::Index(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_name_display() {
        assert_eq!(ReferenceName::Index(3).to_string(), "[3]");
        assert_eq!(ReferenceName::Field(Arc::from("next")).to_string(), "next");
    }
}
