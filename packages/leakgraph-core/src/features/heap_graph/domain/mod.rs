//! Heap graph domain models

pub mod layout;
pub mod objects;
pub mod references;

pub use layout::{FieldLayout, FieldSlot, MAX_HIERARCHY_DEPTH};
pub use objects::{HeapClass, HeapInstance, HeapObject, HeapObjectArray, HeapPrimitiveArray};
pub use references::{HeapReference, ReferenceKind, ReferenceName};
