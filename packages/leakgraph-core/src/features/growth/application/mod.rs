//! Growth application layer

pub mod detector;

pub use detector::HeapGrowthDetector;
