//! Reference Matchers Feature
//!
//! Declarative rules about references that should never be followed, only
//! followed as a fallback, or that mark a known library leak.
//!
//! # Architecture
//!
//! ```text
//! reference_matchers/
//! ├── domain/          # ReferencePattern, MatcherVerdict, ReferenceMatcher
//! └── application/     # MatcherIndex (lookup), ReferenceResolver (per traversal)
//! ```
//!
//! # Precedence
//!
//! Field-name patterns win over type patterns. Among matchers of equal
//! specificity, `AlwaysIgnore` beats `LibraryLeak`, which beats
//! `IgnoreExceptIfReachableFromLeak`, regardless of list order.

pub mod application;
pub mod domain;

pub use application::{sorted_roots, MatchedReference, MatcherIndex, ReferenceResolver};
pub use domain::{default_jdk_matchers, MatcherVerdict, ReferenceMatcher, ReferencePattern};
