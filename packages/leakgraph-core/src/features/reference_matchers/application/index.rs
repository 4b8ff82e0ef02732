//! Immutable lookup structure over a matcher list

use crate::config::ConfigError;
use crate::errors::Result;
use crate::features::reference_matchers::domain::{ReferenceMatcher, ReferencePattern};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::Arc;

type FieldMatchers = FxHashMap<String, Arc<ReferenceMatcher>>;

/// Matchers indexed for O(1) field lookups
///
/// Built once per analysis and shared read-only. Field-name matchers are
/// keyed by `(class, field)`; type, thread and native matchers are short
/// lists scanned per candidate.
#[derive(Debug, Clone, Default)]
pub struct MatcherIndex {
    static_fields: FxHashMap<String, FieldMatchers>,
    instance_fields: FxHashMap<String, FieldMatchers>,
    field_types: Vec<Arc<ReferenceMatcher>>,
    threads: Vec<(Regex, Arc<ReferenceMatcher>)>,
    native_globals: Vec<Arc<ReferenceMatcher>>,
    len: usize,
}

impl MatcherIndex {
    /// Index `matchers`; fails on empty names or an invalid thread regex
    pub fn new(matchers: &[ReferenceMatcher]) -> Result<Self> {
        let mut index = Self::default();
        for matcher in matchers {
            validate(matcher)?;
            let shared = Arc::new(matcher.clone());
            match &matcher.pattern {
                ReferencePattern::StaticField {
                    class_name,
                    field_name,
                } => insert_strongest(&mut index.static_fields, class_name, field_name, shared),
                ReferencePattern::InstanceField {
                    class_name,
                    field_name,
                } => insert_strongest(&mut index.instance_fields, class_name, field_name, shared),
                ReferencePattern::FieldOfType { .. } => index.field_types.push(shared),
                ReferencePattern::Thread { name_pattern } => {
                    let regex = Regex::new(name_pattern).map_err(|e| {
                        ConfigError::invalid_matcher(matcher.pattern.to_string(), e.to_string())
                    })?;
                    index.threads.push((regex, shared));
                }
                ReferencePattern::NativeGlobalVariable { .. } => index.native_globals.push(shared),
            }
            index.len += 1;
        }
        Ok(index)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of matchers indexed, duplicates included
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn static_field(&self, class_name: &str, field_name: &str) -> Option<&Arc<ReferenceMatcher>> {
        self.static_fields.get(class_name)?.get(field_name)
    }

    pub fn instance_field(&self, class_name: &str, field_name: &str) -> Option<&Arc<ReferenceMatcher>> {
        self.instance_fields.get(class_name)?.get(field_name)
    }

    /// Instance-field matchers declared for exactly `class_name`
    pub fn instance_fields_of(&self, class_name: &str) -> Option<&FieldMatchers> {
        self.instance_fields.get(class_name)
    }

    pub fn has_instance_field_matchers(&self) -> bool {
        !self.instance_fields.is_empty()
    }

    pub fn field_type_matchers(&self) -> &[Arc<ReferenceMatcher>] {
        &self.field_types
    }

    pub fn has_thread_matchers(&self) -> bool {
        !self.threads.is_empty()
    }

    /// Strongest thread matcher whose regex matches `thread_name`
    pub fn thread_matcher(&self, thread_name: &str) -> Option<&Arc<ReferenceMatcher>> {
        self.threads
            .iter()
            .filter(|(regex, _)| regex.is_match(thread_name))
            .map(|(_, matcher)| matcher)
            .reduce(|a, b| strongest_arc(a, b))
    }

    pub fn native_global_matchers(&self) -> &[Arc<ReferenceMatcher>] {
        &self.native_globals
    }
}

pub(crate) fn strongest_arc<'a>(
    a: &'a Arc<ReferenceMatcher>,
    b: &'a Arc<ReferenceMatcher>,
) -> &'a Arc<ReferenceMatcher> {
    if std::ptr::eq(ReferenceMatcher::strongest(a, b), &**a) {
        a
    } else {
        b
    }
}

fn insert_strongest(
    map: &mut FxHashMap<String, FieldMatchers>,
    class_name: &str,
    field_name: &str,
    matcher: Arc<ReferenceMatcher>,
) {
    let fields = map.entry(class_name.to_string()).or_default();
    match fields.get(field_name) {
        Some(existing) if Arc::ptr_eq(strongest_arc(existing, &matcher), existing) => {}
        _ => {
            fields.insert(field_name.to_string(), matcher);
        }
    }
}

fn validate(matcher: &ReferenceMatcher) -> Result<()> {
    let names: Vec<&str> = match &matcher.pattern {
        ReferencePattern::StaticField {
            class_name,
            field_name,
        }
        | ReferencePattern::InstanceField {
            class_name,
            field_name,
        } => vec![class_name.as_str(), field_name.as_str()],
        ReferencePattern::FieldOfType {
            class_name,
            field_type,
        } => vec![class_name.as_str(), field_type.as_str()],
        ReferencePattern::Thread { name_pattern } => vec![name_pattern.as_str()],
        ReferencePattern::NativeGlobalVariable { class_name } => vec![class_name.as_str()],
    };
    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(ConfigError::invalid_matcher(matcher.pattern.to_string(), "empty name").into());
    }
    Ok(())
}
