//! Analysis infrastructure: built-in finders, classifiers and mapping reader

pub mod classifiers;
pub mod finders;
pub mod proguard;

pub use classifiers::{ClassNameClassifier, ThreadNameLabeler};
pub use finders::{FilteringLeakingObjectFinder, KeyedReferenceFinder};
pub use proguard::ProguardMappingReader;
