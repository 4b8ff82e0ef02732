//! Binary heap dump (hprof) format
//!
//! ## Hexagonal Architecture
//! - `domain/` - record kinds, index entries, class table types
//! - `ports/` - [`SnapshotSource`], positioned byte access
//! - `application/` - [`HprofIndexer`] producing the immutable [`HprofIndex`]
//! - `infrastructure/` - file/mmap/in-memory sources, stream decoding, writer
//!
//! ## Usage
//! ```no_run
//! use leakgraph_core::features::hprof::{FileSnapshotSource, HprofIndexer};
//!
//! let source = FileSnapshotSource::open("app.hprof")?;
//! let index = HprofIndexer::new().index(&source)?;
//! println!("{} objects", index.object_count());
//! # Ok::<(), leakgraph_core::LeakgraphError>(())
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{HprofIndex, HprofIndexer, ObjectCounts};
pub use domain::{
    normalize_class_name, ClassDef, FieldDef, FieldType, GcRoot, GcRootKind, HeapDumpRecord,
    HeapValue, HprofHeader, HprofVersion, IdentifierSize, IndexedObject, ObjectKind,
    PrimitiveArrayValues, PrimitiveType, Record, StaticField,
};
pub use infrastructure::{
    FileSnapshotSource, HeapDumpBuilder, HprofReader, HprofWriter, InMemorySnapshotSource,
    MmapSnapshotSource, SourceStream,
};
pub use ports::{SnapshotSource, SourceStats};
