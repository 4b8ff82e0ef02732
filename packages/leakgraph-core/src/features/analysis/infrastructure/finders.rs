//! Built-in leaking object finders

use crate::errors::Result;
use crate::features::analysis::ports::LeakingObjectFinder;
use crate::features::heap_graph::{HeapGraph, HeapInstance};
use crate::shared::collections::LongScatterSet;
use crate::shared::constants::watcher;
use tracing::debug;

/// Referents of the watcher's keyed weak references
///
/// A watched object that is still referenced by its weak reference after
/// the watcher gave up on it is retained. Instances whose
/// `retainedUptimeMillis` is `-1` are still within their grace period and
/// are skipped.
#[derive(Debug, Clone)]
pub struct KeyedReferenceFinder {
    class_names: Vec<String>,
}

impl Default for KeyedReferenceFinder {
    fn default() -> Self {
        Self {
            class_names: vec![
                watcher::KEYED_WEAK_REFERENCE.to_string(),
                watcher::LEGACY_KEYED_WEAK_REFERENCE.to_string(),
            ],
        }
    }
}

impl KeyedReferenceFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for instances of `class_name` instead of the default watcher classes
    pub fn with_reference_class(class_name: impl Into<String>) -> Self {
        Self {
            class_names: vec![class_name.into()],
        }
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }
}

impl LeakingObjectFinder for KeyedReferenceFinder {
    fn find_leaking_object_ids(&self, graph: &HeapGraph) -> Result<LongScatterSet> {
        let mut leaking = LongScatterSet::new();
        for class_name in &self.class_names {
            if graph.class_by_name(class_name).is_none() {
                continue;
            }
            for reference in graph.instances_of(class_name) {
                let reference = reference?;
                let Some(referent) = reference.object_field("referent") else {
                    continue;
                };
                let retained_uptime = reference
                    .field(watcher::RETAINED_UPTIME_FIELD)
                    .and_then(|v| v.as_long());
                if retained_uptime == Some(-1) {
                    continue;
                }
                leaking.add(referent);
            }
        }
        debug!(leaking = leaking.size(), "Keyed references with a live referent");
        Ok(leaking)
    }
}

type InstanceFilter = Box<dyn Fn(&HeapGraph, &HeapInstance) -> bool + Send + Sync>;

/// Every instance accepted by at least one filter
#[derive(Default)]
pub struct FilteringLeakingObjectFinder {
    filters: Vec<InstanceFilter>,
}

impl FilteringLeakingObjectFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&HeapGraph, &HeapInstance) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }
}

impl std::fmt::Debug for FilteringLeakingObjectFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteringLeakingObjectFinder")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl LeakingObjectFinder for FilteringLeakingObjectFinder {
    fn find_leaking_object_ids(&self, graph: &HeapGraph) -> Result<LongScatterSet> {
        let mut leaking = LongScatterSet::new();
        if self.filters.is_empty() {
            return Ok(leaking);
        }
        for instance in graph.instances() {
            let instance = instance?;
            if self.filters.iter().any(|filter| filter(graph, &instance)) {
                leaking.add(instance.id);
            }
        }
        Ok(leaking)
    }
}
