//! Heap graph application layer

pub mod graph;

pub use graph::HeapGraph;
