//! Shared module - Common types and utilities
//!
//! Types shared across all features. No dependency on any feature module.

#[macro_use]
pub mod macros;
pub mod collections;
pub mod constants;

// Re-exports for convenience
pub use collections::{LongIntScatterMap, LongObjectScatterMap, LongScatterSet};
