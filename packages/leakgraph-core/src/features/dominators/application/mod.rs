//! Dominator application layer

pub mod dominator_tree;

pub use dominator_tree::{DominatorEntry, DominatorTree};
