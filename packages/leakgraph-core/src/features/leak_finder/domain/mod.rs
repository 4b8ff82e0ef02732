//! Leak finder domain models

pub mod node;

pub use node::{LeakArena, LeakNode, LeakNodeId};
