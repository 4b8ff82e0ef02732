//! Leak traces: the reference path from a GC root to a leaking object

use crate::features::heap_graph::ReferenceKind;
use crate::features::hprof::GcRootKind;
use crate::features::reference_matchers::ReferenceMatcher;
use crate::shared::constants::edges;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// What kind of object holds the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolderKind {
    Object,
    Class,
    Thread,
    Array,
}

impl HolderKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "instance",
            Self::Class => "class",
            Self::Thread => "thread",
            Self::Array => "array",
        }
    }
}

/// Classifier conclusion for one trace element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakingStatus {
    Leaking,
    NotLeaking,
    Unknown,
}

impl fmt::Display for LeakingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Leaking => "YES",
            Self::NotLeaking => "NO",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// Reference from one element to the next
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeakTraceReference {
    pub kind: ReferenceKind,
    /// Field name, or `[i]` for array entries
    pub name: String,
    pub owning_class_name: String,
}

impl LeakTraceReference {
    /// `Owner.field` or `Owner[i]`
    pub fn display_name(&self) -> String {
        let owner = simple_class_name(&self.owning_class_name);
        match self.kind {
            ReferenceKind::ArrayEntry => format!("{}{}", owner, self.name),
            _ => format!("{}.{}", owner, self.name),
        }
    }
}

impl fmt::Display for LeakTraceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReferenceKind::StaticField => write!(f, "static {}", self.display_name()),
            _ => f.write_str(&self.display_name()),
        }
    }
}

/// One object on the path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakTraceElement {
    pub object_id: u64,
    pub holder: HolderKind,
    pub class_name: String,
    /// Own class first; never empty
    pub class_hierarchy: Vec<String>,
    /// Reference to the next element; `None` on the leaking object
    pub reference: Option<LeakTraceReference>,
    /// Set on every element at or after the first excluded reference
    pub exclusion: Option<ReferenceMatcher>,
    pub status: LeakingStatus,
    pub status_reason: String,
    pub labels: Vec<String>,
}

/// Path from a GC root to a leaking object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakTrace {
    pub gc_root_type: GcRootKind,
    /// Root first, leaking object last; never empty
    pub elements: Vec<LeakTraceElement>,
    pub retained_heap_size: Option<u64>,
    pub retained_object_count: Option<u64>,
}

impl LeakTrace {
    pub fn leaking_object(&self) -> Option<&LeakTraceElement> {
        self.elements.last()
    }

    /// References on the path, root side first
    pub fn references(&self) -> impl Iterator<Item = &LeakTraceReference> + '_ {
        self.elements.iter().filter_map(|e| e.reference.as_ref())
    }

    pub fn has_exclusion(&self) -> bool {
        self.elements.iter().any(|e| e.exclusion.is_some())
    }

    /// Stable hex SHA-256 over the class and reference names, in path order
    ///
    /// Object ids and array indices are not part of it, so the same leak in
    /// two snapshots, or in two slots of one array, shares a signature.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        for element in &self.elements {
            hasher.update(element.class_name.as_bytes());
            hasher.update([0u8]);
            if let Some(reference) = &element.reference {
                hasher.update(reference.owning_class_name.as_bytes());
                hasher.update([b'.']);
                let name = match reference.kind {
                    ReferenceKind::ArrayEntry => edges::ARRAY_ELEMENT,
                    _ => reference.name.as_str(),
                };
                hasher.update(name.as_bytes());
            }
            hasher.update([b'\n']);
        }
        format!("{:x}", hasher.finalize())
    }

    /// One-line summary, e.g. `Holder.cache -> Session`
    pub fn short_description(&self) -> String {
        let leaking = self
            .leaking_object()
            .map(|e| simple_class_name(&e.class_name).to_string())
            .unwrap_or_default();
        match self.references().last() {
            Some(reference) => format!("{} -> {}", reference.display_name(), leaking),
            None => format!("{} held by GC root ({})", leaking, self.gc_root_type.as_str()),
        }
    }
}

impl fmt::Display for LeakTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "┬───")?;
        writeln!(f, "│ GC Root: {}", self.gc_root_type.as_str())?;
        writeln!(f, "│")?;
        let last = self.elements.len().saturating_sub(1);
        for (i, element) in self.elements.iter().enumerate() {
            let (head, body) = if i == last { ("╰→", "  ") } else { ("├─", "│ ") };
            writeln!(f, "{} {} {}", head, element.class_name, element.holder.as_str())?;
            if element.status_reason.is_empty() {
                writeln!(f, "{}   Leaking: {}", body, element.status)?;
            } else {
                writeln!(f, "{}   Leaking: {} ({})", body, element.status, element.status_reason)?;
            }
            for label in &element.labels {
                writeln!(f, "{}   {}", body, label)?;
            }
            if i == last {
                if let Some(size) = self.retained_heap_size {
                    writeln!(
                        f,
                        "{}   Retaining {} bytes in {} objects",
                        body,
                        size,
                        self.retained_object_count.unwrap_or(0)
                    )?;
                }
            }
            if let Some(reference) = &element.reference {
                let marker = if element.exclusion.is_some() { " (excluded)" } else { "" };
                writeln!(f, "{}   ↓ {}{}", body, reference, marker)?;
            }
        }
        Ok(())
    }
}

/// Class name without its package
pub fn simple_class_name(class_name: &str) -> &str {
    class_name.rsplit('.').next().unwrap_or(class_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(class_name: &str, reference: Option<LeakTraceReference>) -> LeakTraceElement {
        LeakTraceElement {
            object_id: 1,
            holder: HolderKind::Object,
            class_name: class_name.to_string(),
            class_hierarchy: vec![class_name.to_string()],
            reference,
            exclusion: None,
            status: LeakingStatus::Unknown,
            status_reason: String::new(),
            labels: vec![],
        }
    }

    fn field(owner: &str, name: &str) -> Option<LeakTraceReference> {
        Some(LeakTraceReference {
            kind: ReferenceKind::InstanceField,
            name: name.to_string(),
            owning_class_name: owner.to_string(),
        })
    }

    fn trace(elements: Vec<LeakTraceElement>) -> LeakTrace {
        LeakTrace {
            gc_root_type: GcRootKind::StickyClass,
            elements,
            retained_heap_size: None,
            retained_object_count: None,
        }
    }

    #[test]
    fn test_signature_ignores_object_ids() {
        let a = trace(vec![element("a.Holder", field("a.Holder", "cache")), element("a.Leak", None)]);
        let mut b = a.clone();
        b.elements[0].object_id = 99;
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.signature().len(), 64);
    }

    #[test]
    fn test_signature_ignores_array_index() {
        let entry = |index: &str| {
            Some(LeakTraceReference {
                kind: ReferenceKind::ArrayEntry,
                name: index.to_string(),
                owning_class_name: "a.Session[]".to_string(),
            })
        };
        let a = trace(vec![element("a.Session[]", entry("[0]")), element("a.Session", None)]);
        let b = trace(vec![element("a.Session[]", entry("[7]")), element("a.Session", None)]);
        assert_eq!(a.signature(), b.signature());

        let by_field = trace(vec![element("a.Session[]", field("a.Session[]", "[0]")), element("a.Session", None)]);
        assert_ne!(a.signature(), by_field.signature());
    }

    #[test]
    fn test_signature_is_order_sensitive() {
        let a = trace(vec![element("a.X", field("a.X", "y")), element("a.Y", field("a.Y", "x")), element("a.L", None)]);
        let b = trace(vec![element("a.Y", field("a.Y", "x")), element("a.X", field("a.X", "y")), element("a.L", None)]);
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn test_short_description() {
        let a = trace(vec![element("a.Holder", field("a.Holder", "cache")), element("a.Leak", None)]);
        assert_eq!(a.short_description(), "Holder.cache -> Leak");
        let root_only = trace(vec![element("a.Leak", None)]);
        assert_eq!(root_only.short_description(), "Leak held by GC root (System class)");
    }

    #[test]
    fn test_display_renders_each_element() {
        let a = trace(vec![element("a.Holder", field("a.Holder", "cache")), element("a.Leak", None)]);
        let rendered = a.to_string();
        assert!(rendered.contains("GC Root: System class"));
        assert!(rendered.contains("↓ Holder.cache"));
        assert!(rendered.contains("╰→ a.Leak instance"));
    }
}
