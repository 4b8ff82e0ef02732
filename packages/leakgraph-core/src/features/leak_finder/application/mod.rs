//! Leak finder application layer

pub mod path_finder;

pub use path_finder::{FoundPath, PathFindingResult, ShortestPathFinder};
