//! Reference matcher domain models

pub mod matcher;

pub use matcher::{default_jdk_matchers, MatcherVerdict, ReferenceMatcher, ReferencePattern};
