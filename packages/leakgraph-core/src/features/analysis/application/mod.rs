//! Analysis application layer

pub mod analyzer;
pub mod trace_builder;

pub use analyzer::HeapAnalyzer;
pub use trace_builder::{LeakGroups, LeakTraceBuilder};
