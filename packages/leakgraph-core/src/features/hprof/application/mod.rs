//! Indexing use case

pub mod index;
pub mod indexer;

pub use index::{HprofIndex, ObjectCounts};
pub use indexer::{HprofIndexer, DEFAULT_BUFFER_SIZE};
