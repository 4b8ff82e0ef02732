//! hprof I/O: sources, stream decoding, record parsing and writing

pub mod dump_builder;
pub mod parser;
pub mod sources;
pub mod stream;
pub mod writer;

pub use dump_builder::HeapDumpBuilder;
pub use parser::RecordHeader;
pub use sources::{FileSnapshotSource, InMemorySnapshotSource, MmapSnapshotSource};
pub use stream::{HprofReader, SourceStream};
pub use writer::HprofWriter;
