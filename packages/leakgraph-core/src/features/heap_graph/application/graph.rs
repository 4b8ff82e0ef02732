//! Lazily hydrating view over (index, byte source)

use crate::config::AnalysisConfig;
use crate::errors::{LeakgraphError, Result};
use crate::features::heap_graph::domain::{
    FieldLayout, HeapClass, HeapInstance, HeapObject, HeapObjectArray, HeapPrimitiveArray,
    HeapReference, ReferenceKind, ReferenceName, MAX_HIERARCHY_DEPTH,
};
use crate::features::hprof::{
    ClassDef, GcRoot, HeapDumpRecord, HeapValue, HprofIndex, HprofIndexer, HprofReader,
    IdentifierSize, IndexedObject, PrimitiveArrayValues, SnapshotSource, SourceStats,
};
use crate::shared::constants::jdk;
use lru::LruCache;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::io::Cursor;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Queryable heap snapshot
///
/// Objects are hydrated on demand with one positioned read of their record.
/// The index is shared (`Arc`) and immutable; the optional object cache is
/// the only interior state.
pub struct HeapGraph {
    index: Arc<HprofIndex>,
    source: Box<dyn SnapshotSource>,
    /// Field layout per class id, computed once
    layouts: FxHashMap<u64, Arc<FieldLayout>>,
    cache: Option<Mutex<LruCache<u64, HeapObject>>>,
}

impl std::fmt::Debug for HeapGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapGraph")
            .field("source", &self.source.description())
            .field("objects", &self.index.object_count())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl HeapGraph {
    // ═══════════════════════════════════════════════════════════════════════
    // Construction
    // ═══════════════════════════════════════════════════════════════════════

    /// Index `source` and wrap it
    pub fn open(source: Box<dyn SnapshotSource>, config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let index = HprofIndexer::from_config(config).index(&*source)?;
        Ok(Self::from_index(Arc::new(index), source).with_object_cache(config.object_cache_size))
    }

    /// Share an existing index with a new reader over the same dump
    pub fn from_index(index: Arc<HprofIndex>, source: Box<dyn SnapshotSource>) -> Self {
        let id_size = index.id_size();
        let layouts = index
            .classes()
            .map(|class| {
                let layout = FieldLayout::compute(class.id, id_size, |id| index.class(id));
                (class.id, Arc::new(layout))
            })
            .collect();
        Self {
            index,
            source,
            layouts,
            cache: None,
        }
    }

    /// Keep up to `capacity` hydrated objects; `0` disables caching
    pub fn with_object_cache(mut self, capacity: usize) -> Self {
        self.cache = NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        self
    }

    pub fn index(&self) -> &HprofIndex {
        &self.index
    }

    pub fn shared_index(&self) -> Arc<HprofIndex> {
        Arc::clone(&self.index)
    }

    pub fn id_size(&self) -> IdentifierSize {
        self.index.id_size()
    }

    pub fn gc_roots(&self) -> &[GcRoot] {
        self.index.gc_roots()
    }

    pub fn object_count(&self) -> usize {
        self.index.object_count()
    }

    pub fn source_stats(&self) -> SourceStats {
        self.source.stats()
    }

    /// Origin of the underlying snapshot
    pub fn description(&self) -> String {
        self.source.description()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    pub fn contains(&self, object_id: u64) -> bool {
        self.index.contains(object_id)
    }

    /// Hydrate `object_id`; `ObjectNotFound` when it is not indexed
    pub fn object(&self, object_id: u64) -> Result<HeapObject> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.lock().get(&object_id) {
                return Ok(hit.clone());
            }
        }

        let entry = self
            .index
            .get(object_id)
            .ok_or_else(|| LeakgraphError::object_not_found(object_id))?;
        let object = self.hydrate(object_id, entry)?;

        if let Some(cache) = &self.cache {
            cache.lock().put(object_id, object.clone());
        }
        Ok(object)
    }

    /// Like [`object`](Self::object) but absent ids are `Ok(None)`
    pub fn find_object(&self, object_id: u64) -> Result<Option<HeapObject>> {
        if !self.contains(object_id) {
            return Ok(None);
        }
        self.object(object_id).map(Some)
    }

    pub fn class(&self, class_id: u64) -> Option<HeapClass> {
        self.index.class(class_id).map(heap_class)
    }

    pub fn class_by_name(&self, name: &str) -> Option<HeapClass> {
        self.index
            .class_id_by_name(name)
            .and_then(|id| self.class(id))
    }

    pub fn class_name(&self, class_id: u64) -> Option<&str> {
        self.index.class(class_id).map(|c| c.name.as_str())
    }

    pub fn layout(&self, class_id: u64) -> Option<&FieldLayout> {
        self.layouts.get(&class_id).map(|l| &**l)
    }

    /// Class name of any indexed object without reading its record
    pub fn class_name_of(&self, object_id: u64) -> Option<String> {
        Some(match self.index.get(object_id)? {
            IndexedObject::Class { .. } => self.class_name(object_id)?.to_string(),
            IndexedObject::Instance { class_id, .. } => self.class_display_name(class_id),
            IndexedObject::ObjectArray { array_class_id, .. } => {
                self.class_display_name(array_class_id)
            }
            IndexedObject::PrimitiveArray { primitive_type, .. } => {
                format!("{}[]", primitive_type.java_name())
            }
        })
    }

    /// Class names from `class_id` up to the root class; never empty
    pub fn class_hierarchy(&self, class_id: u64) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = class_id;
        while let Some(class) = self.index.class(current) {
            names.push(class.name.clone());
            current = class.superclass_id;
            if current == 0 || names.len() > MAX_HIERARCHY_DEPTH {
                break;
            }
        }
        if names.is_empty() {
            names.push(self.class_display_name(class_id));
        }
        names
    }

    /// Hierarchy of an object's class; a class object yields its own name
    pub fn object_class_hierarchy(&self, object_id: u64) -> Vec<String> {
        match self.index.get(object_id) {
            Some(IndexedObject::Instance { class_id, .. }) => self.class_hierarchy(class_id),
            Some(IndexedObject::ObjectArray { array_class_id, .. }) => {
                self.class_hierarchy(array_class_id)
            }
            Some(_) => vec![self.class_name_of(object_id).unwrap_or_default()],
            None => vec![unknown_class_name(object_id)],
        }
    }

    /// Whether `class_id` is `ancestor_name` or one of its subclasses
    pub fn is_subclass_of(&self, class_id: u64, ancestor_name: &str) -> bool {
        let mut current = class_id;
        let mut depth = 0;
        while let Some(class) = self.index.class(current) {
            if class.name == ancestor_name {
                return true;
            }
            current = class.superclass_id;
            depth += 1;
            if current == 0 || depth > MAX_HIERARCHY_DEPTH {
                break;
            }
        }
        false
    }

    pub fn is_instance_of(&self, object_id: u64, class_name: &str) -> bool {
        match self.index.get(object_id) {
            Some(IndexedObject::Instance { class_id, .. }) => self.is_subclass_of(class_id, class_name),
            Some(IndexedObject::ObjectArray { array_class_id, .. }) => {
                self.is_subclass_of(array_class_id, class_name)
            }
            Some(IndexedObject::PrimitiveArray { primitive_type, .. }) => {
                class_name == format!("{}[]", primitive_type.java_name())
            }
            Some(IndexedObject::Class { .. }) | None => false,
        }
    }

    /// Ids of `class_name` and every class extending it
    pub fn class_ids_assignable_to(&self, class_name: &str) -> FxHashSet<u64> {
        self.index
            .classes()
            .filter(|c| self.is_subclass_of(c.id, class_name))
            .map(|c| c.id)
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Iteration
    // ═══════════════════════════════════════════════════════════════════════

    pub fn classes(&self) -> impl Iterator<Item = HeapClass> + '_ {
        self.index.classes().map(heap_class)
    }

    /// `(instance id, class id)` of every instance, without hydration
    pub fn instance_ids(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.index.objects().filter_map(|(id, entry)| match entry {
            IndexedObject::Instance { class_id, .. } => Some((id, class_id)),
            _ => None,
        })
    }

    pub fn instances(&self) -> impl Iterator<Item = Result<HeapInstance>> + '_ {
        self.instance_ids().map(move |(id, _)| self.instance(id))
    }

    /// Instances of `class_name`, subclasses included
    pub fn instances_of(&self, class_name: &str) -> impl Iterator<Item = Result<HeapInstance>> + '_ {
        let class_ids = self.class_ids_assignable_to(class_name);
        self.instance_ids()
            .filter(move |(_, class_id)| class_ids.contains(class_id))
            .map(move |(id, _)| self.instance(id))
    }

    pub fn object_arrays(&self) -> impl Iterator<Item = Result<HeapObjectArray>> + '_ {
        self.index
            .objects()
            .filter(|(_, entry)| matches!(entry, IndexedObject::ObjectArray { .. }))
            .map(move |(id, _)| match self.object(id)? {
                HeapObject::ObjectArray(array) => Ok(array),
                _ => Err(LeakgraphError::graph_integrity(id, "hydration")),
            })
    }

    pub fn primitive_arrays(&self) -> impl Iterator<Item = Result<HeapPrimitiveArray>> + '_ {
        self.index
            .objects()
            .filter(|(_, entry)| matches!(entry, IndexedObject::PrimitiveArray { .. }))
            .map(move |(id, _)| match self.object(id)? {
                HeapObject::PrimitiveArray(array) => Ok(array),
                _ => Err(LeakgraphError::graph_integrity(id, "hydration")),
            })
    }

    /// Hydrate an id that must be an instance
    pub fn instance(&self, object_id: u64) -> Result<HeapInstance> {
        match self.object(object_id)? {
            HeapObject::Instance(instance) => Ok(instance),
            _ => Err(LeakgraphError::graph_integrity(object_id, "expected an instance")),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // References and sizes
    // ═══════════════════════════════════════════════════════════════════════

    /// Non-null outgoing references of `object`
    ///
    /// Order: instance fields as laid out (subclass first), class statics in
    /// declaration order, array entries by index.
    pub fn references(&self, object: &HeapObject) -> Vec<HeapReference> {
        match object {
            HeapObject::Instance(instance) => instance
                .layout
                .slots()
                .iter()
                .zip(instance.values.iter())
                .filter_map(|(slot, value)| {
                    value.as_object_id().map(|target_id| HeapReference {
                        kind: ReferenceKind::InstanceField,
                        name: ReferenceName::Field(Arc::clone(&slot.name)),
                        declaring_class_id: slot.declaring_class_id,
                        declaring_class_name: Arc::clone(&slot.declaring_class_name),
                        target_id,
                    })
                })
                .collect(),
            HeapObject::Class(class) => {
                let class_name: Arc<str> = Arc::from(class.name.as_str());
                class
                    .static_fields
                    .iter()
                    .filter_map(|field| {
                        field.value.as_object_id().map(|target_id| HeapReference {
                            kind: ReferenceKind::StaticField,
                            name: ReferenceName::Field(Arc::from(field.name.as_str())),
                            declaring_class_id: class.id,
                            declaring_class_name: Arc::clone(&class_name),
                            target_id,
                        })
                    })
                    .collect()
            }
            HeapObject::ObjectArray(array) => {
                let class_name: Arc<str> = Arc::from(array.class_name.as_str());
                array
                    .element_ids
                    .iter()
                    .enumerate()
                    .filter(|(_, &id)| id != 0)
                    .map(|(i, &target_id)| HeapReference {
                        kind: ReferenceKind::ArrayEntry,
                        name: ReferenceName::Index(i as u32),
                        declaring_class_id: array.array_class_id,
                        declaring_class_name: Arc::clone(&class_name),
                        target_id,
                    })
                    .collect()
            }
            HeapObject::PrimitiveArray(_) => Vec::new(),
        }
    }

    /// Shallow size in bytes, from the index alone
    ///
    /// Instance: class instance size. Object array: `count * id_size`.
    /// Primitive array: `count * element width`. Class: static field bytes.
    pub fn shallow_size(&self, object_id: u64) -> Result<u64> {
        let id_bytes = u64::from(self.id_size().bytes());
        let entry = self
            .index
            .get(object_id)
            .ok_or_else(|| LeakgraphError::object_not_found(object_id))?;
        Ok(match entry {
            IndexedObject::Instance { class_id, .. } => self
                .index
                .class(class_id)
                .map(|c| u64::from(c.instance_size))
                .unwrap_or(0),
            IndexedObject::ObjectArray { record_size, .. } => {
                // tag, id, serial, count, class id
                u64::from(record_size).saturating_sub(9 + 2 * id_bytes)
            }
            IndexedObject::PrimitiveArray { record_size, .. } => {
                // tag, id, serial, count, type
                u64::from(record_size).saturating_sub(10 + id_bytes)
            }
            IndexedObject::Class { .. } => self
                .index
                .class(object_id)
                .map(|c| c.static_fields_byte_size(self.id_size()))
                .unwrap_or(0),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Strings
    // ═══════════════════════════════════════════════════════════════════════

    /// Decode a `java.lang.String` instance
    ///
    /// Handles `char[]` values (with optional `offset`/`count`) and compact
    /// `byte[]` values whose `coder` selects Latin-1 or UTF-16.
    pub fn read_string(&self, instance: &HeapInstance) -> Result<Option<String>> {
        let value_id = match instance.object_field("value") {
            Some(id) => id,
            None => return Ok(None),
        };
        let array = match self.find_object(value_id)? {
            Some(HeapObject::PrimitiveArray(array)) => array,
            _ => return Ok(None),
        };

        Ok(match array.values {
            PrimitiveArrayValues::Char(chars) => {
                let offset = instance
                    .field("offset")
                    .and_then(|v| v.as_int())
                    .unwrap_or(0)
                    .max(0) as usize;
                let count = instance
                    .field("count")
                    .and_then(|v| v.as_int())
                    .map(|c| c.max(0) as usize)
                    .unwrap_or(chars.len());
                let start = offset.min(chars.len());
                let end = (start + count).min(chars.len());
                Some(String::from_utf16_lossy(&chars[start..end]))
            }
            PrimitiveArrayValues::Byte(bytes) => {
                let coder = instance
                    .field("coder")
                    .and_then(|v| v.as_byte())
                    .unwrap_or(jdk::STRING_CODER_LATIN1);
                if coder == jdk::STRING_CODER_LATIN1 {
                    Some(bytes.iter().map(|&b| char::from(b as u8)).collect())
                } else {
                    let units: Vec<u16> = bytes
                        .chunks_exact(2)
                        .map(|pair| u16::from_be_bytes([pair[0] as u8, pair[1] as u8]))
                        .collect();
                    Some(String::from_utf16_lossy(&units))
                }
            }
            _ => None,
        })
    }

    /// Decode the string with id `string_id`; `None` when it is not a string
    pub fn read_string_by_id(&self, string_id: u64) -> Result<Option<String>> {
        if !self.is_instance_of(string_id, jdk::STRING) {
            return Ok(None);
        }
        let instance = self.instance(string_id)?;
        self.read_string(&instance)
    }

    /// `name` of a `java.lang.Thread` instance
    pub fn thread_name(&self, thread_id: u64) -> Result<Option<String>> {
        if !self.is_instance_of(thread_id, jdk::THREAD) {
            return Ok(None);
        }
        let thread = self.instance(thread_id)?;
        match thread.object_field("name") {
            Some(name_id) => self.read_string_by_id(name_id),
            None => Ok(None),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internal: Hydration
    // ═══════════════════════════════════════════════════════════════════════

    fn hydrate(&self, object_id: u64, entry: IndexedObject) -> Result<HeapObject> {
        if let IndexedObject::Class { .. } = entry {
            return self
                .class(object_id)
                .map(HeapObject::Class)
                .ok_or_else(|| LeakgraphError::graph_integrity(object_id, "class table"));
        }

        let record = self.index.read_record(&*self.source, object_id)?;
        match (entry, record) {
            (IndexedObject::Instance { class_id, position, .. }, HeapDumpRecord::InstanceDump(dump)) => {
                let layout = match self.layouts.get(&class_id) {
                    Some(layout) => Arc::clone(layout),
                    None => {
                        debug!(object_id, class_id, "instance of a class missing from the dump");
                        Arc::new(FieldLayout::default())
                    }
                };
                let values = decode_fields(&layout, &dump.field_values, self.id_size(), position)?;
                Ok(HeapObject::Instance(HeapInstance {
                    id: object_id,
                    class_id,
                    class_name: self.class_display_name(class_id),
                    layout,
                    values,
                }))
            }
            (IndexedObject::ObjectArray { array_class_id, .. }, HeapDumpRecord::ObjectArrayDump(dump)) => {
                Ok(HeapObject::ObjectArray(HeapObjectArray {
                    id: object_id,
                    array_class_id,
                    class_name: self.class_display_name(array_class_id),
                    element_ids: dump.element_ids,
                }))
            }
            (IndexedObject::PrimitiveArray { .. }, HeapDumpRecord::PrimitiveArrayDump(dump)) => {
                Ok(HeapObject::PrimitiveArray(HeapPrimitiveArray {
                    id: object_id,
                    values: dump.values,
                }))
            }
            _ => Err(LeakgraphError::graph_integrity(object_id, "hydration")),
        }
    }

    fn class_display_name(&self, class_id: u64) -> String {
        self.class_name(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| unknown_class_name(class_id))
    }
}

fn heap_class(class: &ClassDef) -> HeapClass {
    HeapClass {
        id: class.id,
        name: class.name.clone(),
        superclass_id: class.superclass_id,
        instance_size: class.instance_size,
        static_fields: class.static_fields.clone(),
        instance_fields: class.instance_fields.clone(),
    }
}

fn unknown_class_name(class_id: u64) -> String {
    format!("unknown.Class@0x{:x}", class_id)
}

/// Decode instance field bytes against a layout
fn decode_fields(
    layout: &FieldLayout,
    bytes: &[u8],
    id_size: IdentifierSize,
    position: u64,
) -> Result<Vec<HeapValue>> {
    if (bytes.len() as u64) < u64::from(layout.byte_size()) {
        return Err(LeakgraphError::parse(
            position,
            format!(
                "instance carries {} field bytes, its class layout needs {}",
                bytes.len(),
                layout.byte_size()
            ),
        ));
    }
    let mut reader = HprofReader::new(Cursor::new(bytes), id_size, 0, bytes.len() as u64);
    layout
        .slots()
        .iter()
        .map(|slot| reader.read_value(slot.field_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::hprof::{FieldType, HeapDumpBuilder, PrimitiveType};

    fn graph(builder: &HeapDumpBuilder) -> HeapGraph {
        let source = builder.build_source().unwrap();
        HeapGraph::open(Box::new(source), &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_field_access_walks_superclasses() {
        let mut builder = HeapDumpBuilder::new();
        let base = builder.class("com.example.Base", &[("id", FieldType::Primitive(PrimitiveType::Long))]);
        let derived = builder.class_with_superclass(
            "com.example.Derived",
            base,
            &[("label", FieldType::Object), ("id", FieldType::Primitive(PrimitiveType::Long))],
        );
        let instance = builder.instance(derived, &[("id", HeapValue::Long(7))]);
        let graph = graph(&builder);

        let object = graph.object(instance).unwrap();
        let instance = object.as_instance().unwrap();
        assert_eq!(instance.class_name, "com.example.Derived");
        assert_eq!(instance.field("id"), Some(HeapValue::Long(7)));
        assert_eq!(instance.field_in("com.example.Base", "id"), Some(HeapValue::Long(0)));
        assert_eq!(instance.field("label"), Some(HeapValue::Object(0)));
        assert_eq!(instance.field("missing"), None);
    }

    #[test]
    fn test_missing_object_is_not_found() {
        let builder = HeapDumpBuilder::new();
        let graph = graph(&builder);
        assert!(matches!(
            graph.object(0xdead),
            Err(LeakgraphError::ObjectNotFound { object_id: 0xdead })
        ));
        assert!(graph.find_object(0xdead).unwrap().is_none());
    }

    #[test]
    fn test_class_hierarchy_and_instance_of() {
        let mut builder = HeapDumpBuilder::new();
        let base = builder.class("com.example.Base", &[]);
        let derived = builder.class_with_superclass("com.example.Derived", base, &[]);
        let object = builder.instance(derived, &[]);
        let graph = graph(&builder);

        assert_eq!(
            graph.class_hierarchy(derived),
            vec!["com.example.Derived", "com.example.Base", "java.lang.Object"]
        );
        assert!(graph.is_instance_of(object, "com.example.Base"));
        assert!(!graph.is_instance_of(object, "java.lang.String"));
        assert_eq!(graph.class_hierarchy(0xbeef).len(), 1);
        assert_eq!(graph.instances_of("com.example.Base").count(), 1);
        assert_eq!(graph.class_by_name("com.example.Base").map(|c| c.id), Some(base));
    }

    #[test]
    fn test_read_char_and_latin1_strings() {
        let mut builder = HeapDumpBuilder::new();
        builder.class(
            jdk::STRING,
            &[
                ("value", FieldType::Object),
                ("coder", FieldType::Primitive(PrimitiveType::Byte)),
            ],
        );
        let utf16 = builder.string("héllo");
        let bytes = builder.primitive_array(PrimitiveArrayValues::Byte(vec![0x61, 0x62]));
        let string_class = builder.class_id(jdk::STRING).unwrap();
        let latin1 = builder.instance(string_class, &[("value", HeapValue::Object(bytes))]);
        let graph = graph(&builder);

        assert_eq!(graph.read_string_by_id(utf16).unwrap().as_deref(), Some("héllo"));
        assert_eq!(graph.read_string_by_id(latin1).unwrap().as_deref(), Some("ab"));
        assert_eq!(graph.read_string_by_id(bytes).unwrap(), None);
    }

    #[test]
    fn test_thread_name() {
        let mut builder = HeapDumpBuilder::new();
        let (thread, _) = builder.thread("main");
        let graph = graph(&builder);
        assert_eq!(graph.thread_name(thread).unwrap().as_deref(), Some("main"));
    }

    #[test]
    fn test_shallow_sizes() {
        let mut builder = HeapDumpBuilder::new();
        let class = builder.class(
            "com.example.Sized",
            &[("a", FieldType::Object), ("b", FieldType::Primitive(PrimitiveType::Long))],
        );
        builder.static_field(class, "COUNT", HeapValue::Int(1)).unwrap();
        let instance = builder.instance(class, &[]);
        let objects = builder.object_array("java.lang.Object", &[0, 0, 0]);
        let longs = builder.primitive_array(PrimitiveArrayValues::Long(vec![1, 2]));
        let graph = graph(&builder);

        assert_eq!(graph.shallow_size(instance).unwrap(), 12);
        assert_eq!(graph.shallow_size(objects).unwrap(), 12);
        assert_eq!(graph.shallow_size(longs).unwrap(), 16);
        assert_eq!(graph.shallow_size(class).unwrap(), 4);
    }

    #[test]
    fn test_references_skip_nulls() {
        let mut builder = HeapDumpBuilder::new();
        let node = builder.class("com.example.Node", &[("a", FieldType::Object), ("b", FieldType::Object)]);
        let target = builder.instance(node, &[]);
        let holder = builder.instance(node, &[("b", HeapValue::Object(target))]);
        let array = builder.object_array("com.example.Node", &[0, target]);
        builder.static_field(node, "ROOT", HeapValue::Object(holder)).unwrap();
        let graph = graph(&builder);

        let refs = graph.references(&graph.object(holder).unwrap());
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name.to_string(), "b");
        assert_eq!(refs[0].target_id, target);

        let refs = graph.references(&graph.object(array).unwrap());
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, ReferenceName::Index(1));

        let refs = graph.references(&graph.object(node).unwrap());
        assert_eq!(refs[0].kind, ReferenceKind::StaticField);
        assert_eq!(refs[0].target_id, holder);
    }

    #[test]
    fn test_cache_avoids_rereads() {
        let mut builder = HeapDumpBuilder::new();
        let class = builder.class("com.example.Cached", &[]);
        let instance = builder.instance(class, &[]);
        let source = builder.build_source().unwrap();
        let config = AnalysisConfig::default().object_cache_size(16);
        let graph = HeapGraph::open(Box::new(source), &config).unwrap();

        graph.object(instance).unwrap();
        let after_first = graph.source_stats().reads;
        graph.object(instance).unwrap();
        assert_eq!(graph.source_stats().reads, after_first);
    }

    #[test]
    fn test_shared_index_backs_two_readers() {
        let mut builder = HeapDumpBuilder::new();
        let class = builder.class("com.example.Shared", &[]);
        let instance = builder.instance(class, &[]);
        let source = builder.build_source().unwrap();
        let first = HeapGraph::open(Box::new(source.clone()), &AnalysisConfig::default()).unwrap();
        let second = HeapGraph::from_index(first.shared_index(), Box::new(source));
        assert_eq!(first.object(instance).unwrap(), second.object(instance).unwrap());
    }
}
