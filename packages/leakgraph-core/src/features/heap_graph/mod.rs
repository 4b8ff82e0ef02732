//! Heap Graph Feature
//!
//! Random-access view of a snapshot: the index tells where each object's
//! record lives, and objects are decoded from the source only when asked for.
//!
//! # Architecture
//!
//! ```text
//! heap_graph/
//! ├── domain/          # HeapObject variants, field layouts, references
//! └── application/     # HeapGraph (hydration, hierarchy, strings, sizes)
//! ```

pub mod application;
pub mod domain;

pub use application::HeapGraph;
pub use domain::{
    FieldLayout, FieldSlot, HeapClass, HeapInstance, HeapObject, HeapObjectArray,
    HeapPrimitiveArray, HeapReference, ReferenceKind, ReferenceName, MAX_HIERARCHY_DEPTH,
};
