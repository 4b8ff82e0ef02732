//! Declarative reference patterns and their verdicts

use crate::shared::constants::jdk;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Which references a matcher applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReferencePattern {
    /// Static field `field_name` of exactly `class_name`
    StaticField { class_name: String, field_name: String },

    /// Instance field `field_name` of `class_name` or any subclass
    InstanceField { class_name: String, field_name: String },

    /// Any field of `class_name` whose referent is a `field_type`
    FieldOfType { class_name: String, field_type: String },

    /// Java-frame locals of threads whose name matches `name_pattern` (regex)
    Thread { name_pattern: String },

    /// JNI global roots pointing at instances of `class_name`
    NativeGlobalVariable { class_name: String },
}

impl ReferencePattern {
    pub fn static_field(class_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self::StaticField {
            class_name: class_name.into(),
            field_name: field_name.into(),
        }
    }

    pub fn instance_field(class_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self::InstanceField {
            class_name: class_name.into(),
            field_name: field_name.into(),
        }
    }

    pub fn field_of_type(class_name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self::FieldOfType {
            class_name: class_name.into(),
            field_type: field_type.into(),
        }
    }

    pub fn thread(name_pattern: impl Into<String>) -> Self {
        Self::Thread {
            name_pattern: name_pattern.into(),
        }
    }

    pub fn native_global_variable(class_name: impl Into<String>) -> Self {
        Self::NativeGlobalVariable {
            class_name: class_name.into(),
        }
    }

    /// Field-name patterns beat type and root patterns
    pub fn is_field_name_match(&self) -> bool {
        matches!(self, Self::StaticField { .. } | Self::InstanceField { .. })
    }
}

impl fmt::Display for ReferencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticField {
                class_name,
                field_name,
            } => write!(f, "static field {}#{}", class_name, field_name),
            Self::InstanceField {
                class_name,
                field_name,
            } => write!(f, "instance field {}#{}", class_name, field_name),
            Self::FieldOfType {
                class_name,
                field_type,
            } => write!(f, "field of type {} in {}", field_type, class_name),
            Self::Thread { name_pattern } => write!(f, "local variable on thread /{}/", name_pattern),
            Self::NativeGlobalVariable { class_name } => {
                write!(f, "native global variable referencing {}", class_name)
            }
        }
    }
}

/// What a matching reference means for the search
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum MatcherVerdict {
    /// The edge is never followed
    AlwaysIgnore,

    /// Followed, but paths through it are only a fallback
    IgnoreExceptIfReachableFromLeak,

    /// Known leak in a library; paths through it are reported separately
    LibraryLeak { description: String },
}

impl MatcherVerdict {
    /// Higher wins among matchers of equal specificity
    pub fn precedence(&self) -> u8 {
        match self {
            Self::AlwaysIgnore => 2,
            Self::LibraryLeak { .. } => 1,
            Self::IgnoreExceptIfReachableFromLeak => 0,
        }
    }

    pub fn is_always_ignore(&self) -> bool {
        matches!(self, Self::AlwaysIgnore)
    }

    pub fn library_leak_description(&self) -> Option<&str> {
        match self {
            Self::LibraryLeak { description } => Some(description),
            _ => None,
        }
    }
}

/// A pattern with its verdict
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceMatcher {
    pub pattern: ReferencePattern,
    pub verdict: MatcherVerdict,
}

impl ReferenceMatcher {
    pub fn new(pattern: ReferencePattern, verdict: MatcherVerdict) -> Self {
        Self { pattern, verdict }
    }

    pub fn ignored(pattern: ReferencePattern) -> Self {
        Self::new(pattern, MatcherVerdict::AlwaysIgnore)
    }

    pub fn ignored_unless_reachable_from_leak(pattern: ReferencePattern) -> Self {
        Self::new(pattern, MatcherVerdict::IgnoreExceptIfReachableFromLeak)
    }

    pub fn library_leak(pattern: ReferencePattern, description: impl Into<String>) -> Self {
        Self::new(
            pattern,
            MatcherVerdict::LibraryLeak {
                description: description.into(),
            },
        )
    }

    /// Order-independent choice between two matchers of equal specificity:
    /// higher verdict precedence, then the lexically smaller pattern.
    pub fn strongest<'a>(a: &'a Self, b: &'a Self) -> &'a Self {
        match a.verdict.precedence().cmp(&b.verdict.precedence()) {
            Ordering::Greater => a,
            Ordering::Less => b,
            Ordering::Equal => {
                if (a.pattern.to_string(), format!("{:?}", a.verdict))
                    <= (b.pattern.to_string(), format!("{:?}", b.verdict))
                {
                    a
                } else {
                    b
                }
            }
        }
    }
}

impl fmt::Display for ReferenceMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            MatcherVerdict::AlwaysIgnore => write!(f, "ignored {}", self.pattern),
            MatcherVerdict::IgnoreExceptIfReachableFromLeak => {
                write!(f, "ignored unless reachable from leak: {}", self.pattern)
            }
            MatcherVerdict::LibraryLeak { description } => {
                write!(f, "library leak {}: {}", self.pattern, description)
            }
        }
    }
}

/// Matchers every JVM heap needs
///
/// Weak, soft, phantom and finalizer references never keep their referent
/// alive, and the finalizer queues link every finalizable object together.
pub fn default_jdk_matchers() -> Vec<ReferenceMatcher> {
    let mut matchers = vec![ReferenceMatcher::ignored(ReferencePattern::instance_field(
        jdk::REFERENCE,
        "referent",
    ))];
    for class_name in [jdk::FINALIZER, jdk::FINALIZER_REFERENCE] {
        for field_name in ["prev", "next", "element"] {
            matchers.push(ReferenceMatcher::ignored(ReferencePattern::instance_field(
                class_name, field_name,
            )));
        }
    }
    matchers.push(ReferenceMatcher::ignored(ReferencePattern::thread(
        "^FinalizerWatchdogDaemon$",
    )));
    matchers
}
