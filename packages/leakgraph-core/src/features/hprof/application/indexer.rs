//! Single streaming pass from raw dump bytes to [`HprofIndex`]
//!
//! # Algorithm
//! 1. Parse the header and adopt its identifier size
//! 2. Walk top-level records; strings and class loads feed lookup tables
//! 3. Inside heap dump segments, record `(position, record_size)` plus the
//!    minimal metadata of every object, skipping field and element bytes
//! 4. Resolve class names, build the class table, prune the string table
//!
//! Indexing never recovers: the first malformed byte aborts with a
//! [`LeakgraphError::Parse`] carrying its absolute offset.

use super::index::{HprofIndex, ObjectCounts};
use crate::config::AnalysisConfig;
use crate::errors::{LeakgraphError, Result};
use crate::features::hprof::domain::{
    normalize_class_name, sub_tags, tags, ClassDef, ClassDumpRecord, FieldDef, GcRoot,
    HprofHeader, IdentifierSize, IndexedObject, StaticField,
};
use crate::features::hprof::infrastructure::parser::{is_root_tag, RecordHeader};
use crate::features::hprof::infrastructure::{HprofReader, SourceStream};
use crate::features::hprof::ports::SnapshotSource;
use crate::shared::collections::LongObjectScatterMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::io::{Read, Seek};
use std::time::Instant;
use tracing::{debug, info};

/// Default read-ahead for the indexing pass
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Builds an [`HprofIndex`] in one pass over a [`SnapshotSource`]
#[derive(Debug, Clone)]
pub struct HprofIndexer {
    buffer_size: usize,
    retain_all_strings: bool,
}

impl Default for HprofIndexer {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            retain_all_strings: false,
        }
    }
}

/// Mutable state of one indexing pass
struct IndexingState {
    objects: LongObjectScatterMap<IndexedObject>,
    class_dumps: Vec<ClassDumpRecord>,
    load_class_names: FxHashMap<u64, u64>,
    strings: FxHashMap<u64, String>,
    gc_roots: Vec<GcRoot>,
    thread_objects: FxHashMap<u32, u64>,
    counts: ObjectCounts,
    duplicate_ids: u64,
    segments: u64,
}

impl IndexingState {
    fn new() -> Self {
        Self {
            objects: LongObjectScatterMap::new(),
            class_dumps: Vec::new(),
            load_class_names: FxHashMap::default(),
            strings: FxHashMap::default(),
            gc_roots: Vec::new(),
            thread_objects: FxHashMap::default(),
            counts: ObjectCounts::default(),
            duplicate_ids: 0,
            segments: 0,
        }
    }

    /// First definition of an id wins
    fn add_object(&mut self, id: u64, entry: IndexedObject) {
        if self.objects.contains_key(id) {
            self.duplicate_ids += 1;
            return;
        }
        self.counts.bump(entry.kind());
        self.objects.insert(id, entry);
    }
}

impl HprofIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            buffer_size: config.stream_buffer_size,
            retain_all_strings: config.retain_all_strings,
        }
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Keep every string record instead of only class and field names
    pub fn retain_all_strings(mut self, retain: bool) -> Self {
        self.retain_all_strings = retain;
        self
    }

    pub fn index(&self, source: &dyn SnapshotSource) -> Result<HprofIndex> {
        let start = Instant::now();
        let source_len = source.len();
        let stream = SourceStream::new(source, self.buffer_size);
        let mut reader = HprofReader::new(stream, IdentifierSize::U4, 0, source_len);

        let header = reader.read_header()?;
        debug!(
            version = header.version.header_string(),
            id_size = header.identifier_size.bytes(),
            "hprof header parsed"
        );

        let mut state = IndexingState::new();
        while reader.remaining() > 0 {
            let record = reader.read_record_header()?;
            if record.end() > source_len {
                return Err(LeakgraphError::parse(
                    record.position,
                    format!(
                        "record 0x{:02x} of {} bytes overruns the end of the dump",
                        record.tag, record.length
                    ),
                ));
            }

            match record.tag {
                tags::STRING_IN_UTF8 => self.read_string(&mut reader, &record, &mut state)?,
                tags::LOAD_CLASS => {
                    reader.read_u32()?;
                    let class_id = reader.read_id()?;
                    reader.read_u32()?;
                    let name_string_id = reader.read_id()?;
                    state.load_class_names.insert(class_id, name_string_id);
                    // Tolerate trailing bytes some writers append
                    let trailing = record.end().checked_sub(reader.position()).ok_or_else(|| {
                        LeakgraphError::parse(record.position, "LOAD_CLASS record is too short")
                    })?;
                    reader.skip(trailing)?;
                }
                tags::HEAP_DUMP | tags::HEAP_DUMP_SEGMENT => {
                    self.index_segment(&mut reader, &record, &mut state)?;
                }
                tags::HEAP_DUMP_END => reader.skip(u64::from(record.length))?,
                tag if tags::SKIPPED.contains(&tag) => reader.skip(u64::from(record.length))?,
                other => {
                    return Err(LeakgraphError::parse(
                        record.position,
                        format!("unknown record tag 0x{:02x}", other),
                    ))
                }
            }
        }

        let index = self.finish(header, state, source_len);
        info!(
            objects = index.object_count(),
            classes = index.counts.classes,
            instances = index.counts.instances,
            gc_roots = index.gc_roots.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "heap dump indexed"
        );
        Ok(index)
    }

    fn read_string<R: Read + Seek>(
        &self,
        reader: &mut HprofReader<R>,
        record: &RecordHeader,
        state: &mut IndexingState,
    ) -> Result<()> {
        let id_bytes = reader.id_size().bytes();
        if record.length < id_bytes {
            return Err(LeakgraphError::parse(
                record.position,
                format!("string record of {} bytes is shorter than an id", record.length),
            ));
        }
        let id = reader.read_id()?;
        let value = reader.read_utf8((record.length - id_bytes) as usize)?;
        state.strings.insert(id, value);
        Ok(())
    }

    fn index_segment<R: Read + Seek>(
        &self,
        reader: &mut HprofReader<R>,
        record: &RecordHeader,
        state: &mut IndexingState,
    ) -> Result<()> {
        let end = record.end();
        let outer_limit = reader.set_limit(end);
        let id_bytes = u64::from(reader.id_size().bytes());
        state.segments += 1;

        while reader.position() < end {
            let position = reader.position();
            let tag = reader.read_u8()?;
            match tag {
                sub_tags::CLASS_DUMP => {
                    let class = reader.read_class_dump()?;
                    let record_size = record_size(reader, position)?;
                    state.add_object(
                        class.id,
                        IndexedObject::Class {
                            position,
                            superclass_id: class.superclass_id,
                            instance_size: class.instance_size,
                            record_size,
                        },
                    );
                    state.class_dumps.push(ClassDumpRecord {
                        constant_pool: Vec::new(),
                        ..class
                    });
                }
                sub_tags::INSTANCE_DUMP => {
                    let id = reader.read_id()?;
                    reader.read_u32()?;
                    let class_id = reader.read_id()?;
                    let length = reader.read_u32()?;
                    reader.skip(u64::from(length))?;
                    let record_size = record_size(reader, position)?;
                    state.add_object(
                        id,
                        IndexedObject::Instance {
                            position,
                            class_id,
                            record_size,
                        },
                    );
                }
                sub_tags::OBJECT_ARRAY_DUMP => {
                    let id = reader.read_id()?;
                    reader.read_u32()?;
                    let count = reader.read_u32()?;
                    let array_class_id = reader.read_id()?;
                    reader.skip(u64::from(count) * id_bytes)?;
                    let record_size = record_size(reader, position)?;
                    state.add_object(
                        id,
                        IndexedObject::ObjectArray {
                            position,
                            array_class_id,
                            record_size,
                        },
                    );
                }
                sub_tags::PRIMITIVE_ARRAY_DUMP => {
                    let id = reader.read_id()?;
                    reader.read_u32()?;
                    let count = reader.read_u32()?;
                    let primitive_type = reader.read_primitive_type()?;
                    reader.skip(u64::from(count) * u64::from(primitive_type.byte_size()))?;
                    let record_size = record_size(reader, position)?;
                    state.add_object(
                        id,
                        IndexedObject::PrimitiveArray {
                            position,
                            primitive_type,
                            record_size,
                        },
                    );
                }
                sub_tags::PRIMITIVE_ARRAY_NODATA => {
                    // Android placeholder without contents; nothing to index
                    reader.read_id()?;
                    reader.read_u32()?;
                    reader.read_u32()?;
                    reader.read_primitive_type()?;
                }
                sub_tags::HEAP_DUMP_INFO => {
                    reader.read_u32()?;
                    reader.read_id()?;
                }
                root_tag if is_root_tag(root_tag) => {
                    let root = reader.read_gc_root(root_tag, position)?;
                    if let GcRoot::ThreadObject { id, thread_serial, .. } = root {
                        state.thread_objects.insert(thread_serial, id);
                    }
                    state.gc_roots.push(root);
                }
                other => {
                    return Err(LeakgraphError::parse(
                        position,
                        format!("unknown heap dump sub-record tag 0x{:02x}", other),
                    ))
                }
            }
        }

        reader.set_limit(outer_limit);
        debug!(segment = state.segments, end, "heap dump segment indexed");
        Ok(())
    }

    fn finish(&self, header: HprofHeader, state: IndexingState, source_len: u64) -> HprofIndex {
        let IndexingState {
            objects,
            class_dumps,
            load_class_names,
            mut strings,
            gc_roots,
            thread_objects,
            counts,
            duplicate_ids,
            ..
        } = state;

        if duplicate_ids > 0 {
            debug!(duplicate_ids, "ignored redefinitions of already indexed ids");
        }

        let mut referenced: FxHashSet<u64> = FxHashSet::default();
        let mut classes = FxHashMap::default();
        let mut class_names = FxHashMap::default();

        for dump in class_dumps {
            let name = match load_class_names.get(&dump.id) {
                Some(&string_id) => {
                    referenced.insert(string_id);
                    match strings.get(&string_id) {
                        Some(raw) => normalize_class_name(raw),
                        None => unknown_class_name(dump.id),
                    }
                }
                None => unknown_class_name(dump.id),
            };

            let mut field_name = |string_id: u64| -> String {
                referenced.insert(string_id);
                strings
                    .get(&string_id)
                    .cloned()
                    .unwrap_or_else(|| format!("field@0x{:x}", string_id))
            };

            let static_fields = dump
                .static_fields
                .iter()
                .map(|f| StaticField {
                    name: field_name(f.name_string_id),
                    value: f.value,
                })
                .collect();
            let instance_fields = dump
                .fields
                .iter()
                .map(|f| FieldDef {
                    name: field_name(f.name_string_id),
                    field_type: f.field_type,
                })
                .collect();

            class_names.entry(name.clone()).or_insert(dump.id);
            classes.entry(dump.id).or_insert(ClassDef {
                id: dump.id,
                name,
                superclass_id: dump.superclass_id,
                class_loader_id: dump.class_loader_id,
                instance_size: dump.instance_size,
                static_fields,
                instance_fields,
            });
        }

        if !self.retain_all_strings {
            strings.retain(|id, _| referenced.contains(id));
        }

        HprofIndex {
            header,
            objects,
            classes,
            class_names,
            gc_roots,
            thread_objects,
            strings,
            counts,
            source_len,
        }
    }
}

fn record_size<R: Read + Seek>(reader: &HprofReader<R>, position: u64) -> Result<u32> {
    u32::try_from(reader.position() - position)
        .map_err(|_| LeakgraphError::parse(position, "sub-record larger than 4 GiB"))
}

fn unknown_class_name(class_id: u64) -> String {
    format!("unknown.Class@0x{:x}", class_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::hprof::domain::{
        FieldType, HeapValue, ObjectKind, PrimitiveArrayValues, PrimitiveType,
    };
    use crate::features::hprof::infrastructure::{HeapDumpBuilder, InMemorySnapshotSource};

    fn sample() -> (HeapDumpBuilder, u64, u64, u64) {
        let mut builder = HeapDumpBuilder::new();
        let node = builder.class(
            "com.example.Node",
            &[
                ("next", FieldType::Object),
                ("weight", FieldType::Primitive(PrimitiveType::Int)),
            ],
        );
        let tail = builder.instance(node, &[("weight", HeapValue::Int(2))]);
        let head = builder.instance(node, &[("next", HeapValue::Object(tail))]);
        builder.root(GcRoot::JniGlobal {
            id: head,
            jni_global_ref_id: 1,
        });
        (builder, node, head, tail)
    }

    #[test]
    fn test_index_counts_and_classes() {
        let (builder, node, head, _) = sample();
        let source = builder.build_source().unwrap();
        let index = HprofIndexer::new().index(&source).unwrap();

        assert_eq!(index.counts().instances, 2);
        assert_eq!(index.counts().classes, 2);
        assert_eq!(index.class_id_by_name("com.example.Node"), Some(node));
        assert_eq!(index.class_id_by_name("java.lang.Object"), Some(builder.object_class_id()));

        let class = index.class(node).unwrap();
        assert_eq!(class.instance_size, 8);
        assert_eq!(class.instance_fields[0].name, "next");
        assert_eq!(index.gc_roots().len(), 1);
        assert_eq!(index.gc_roots()[0].object_id(), head);
    }

    #[test]
    fn test_every_position_parses_back_to_its_id() {
        let (mut builder, _, _, _) = sample();
        builder.primitive_array(PrimitiveArrayValues::Long(vec![1, 2, 3]));
        builder.object_array("java.lang.Object", &[0, 0]);
        let source = builder.records_per_segment(2).build_source().unwrap();
        let index = HprofIndexer::new().buffer_size(64).index(&source).unwrap();

        assert!(index.object_count() > 0);
        for (id, entry) in index.objects() {
            let record = index.read_record(&source, id).unwrap();
            assert_eq!(record.object_id(), Some(id));
            assert!(entry.position() < index.source_len());
        }
    }

    #[test]
    fn test_strings_are_pruned_unless_retained() {
        let (builder, node, _, _) = sample();
        let source = builder.build_source().unwrap();
        let pruned = HprofIndexer::new().index(&source).unwrap();
        let kept = HprofIndexer::new().retain_all_strings(true).index(&source).unwrap();
        assert!(pruned.strings.len() <= kept.strings.len());
        assert!(pruned.class(node).is_some());
    }

    #[test]
    fn test_thread_serials_are_indexed() {
        let mut builder = HeapDumpBuilder::new();
        let (thread, serial) = builder.thread("main");
        let source = builder.build_source().unwrap();
        let index = HprofIndexer::new().index(&source).unwrap();
        assert_eq!(index.thread_object_id(serial), Some(thread));
        assert_eq!(index.get(thread).map(|e| e.kind()), Some(ObjectKind::Instance));
    }

    #[test]
    fn test_truncated_dump_is_parse_error() {
        let (builder, _, _, _) = sample();
        let bytes = builder.build().unwrap();
        let truncated = InMemorySnapshotSource::new(bytes[..bytes.len() - 12].to_vec());
        let err = HprofIndexer::new().index(&truncated).unwrap_err();
        assert!(matches!(err, LeakgraphError::Parse { .. }));
    }

    #[test]
    fn test_unknown_top_level_tag_is_parse_error() {
        let (builder, _, _, _) = sample();
        let mut bytes = builder.build().unwrap();
        bytes.extend_from_slice(&[0x77, 0, 0, 0, 0, 0, 0, 0, 0]);
        let offset = (bytes.len() - 9) as u64;
        let err = HprofIndexer::new()
            .index(&InMemorySnapshotSource::new(bytes))
            .unwrap_err();
        assert_eq!(err.offset(), Some(offset));
    }

    #[test]
    fn test_sub_record_overrunning_segment_is_parse_error() {
        let mut builder = HeapDumpBuilder::new();
        builder.primitive_array(PrimitiveArrayValues::Int(vec![1, 2, 3, 4]));
        let mut bytes = builder.build().unwrap();
        // Shrink the segment length by 4 so the array overruns it and the
        // END record is read as segment data
        let segment_end = bytes.len() - 9;
        let segment_tag = (0..segment_end)
            .find(|&p| {
                bytes[p] == tags::HEAP_DUMP_SEGMENT
                    && p + 9 <= segment_end
                    && p + 9 + u32::from_be_bytes(bytes[p + 5..p + 9].try_into().unwrap()) as usize
                        == segment_end
            })
            .unwrap();
        let len_at = segment_tag + 5;
        let len = u32::from_be_bytes(bytes[len_at..len_at + 4].try_into().unwrap());
        bytes[len_at..len_at + 4].copy_from_slice(&(len - 4).to_be_bytes());
        let result = HprofIndexer::new().index(&InMemorySnapshotSource::new(bytes));
        assert!(matches!(result, Err(LeakgraphError::Parse { .. })));
    }

    #[test]
    fn test_eight_byte_identifiers() {
        let mut builder = HeapDumpBuilder::with_identifier_size(IdentifierSize::U8);
        let class = builder.class("com.example.Wide", &[("other", FieldType::Object)]);
        let a = builder.instance(class, &[]);
        builder.instance(class, &[("other", HeapValue::Object(a))]);
        let source = builder.build_source().unwrap();
        let index = HprofIndexer::new().index(&source).unwrap();
        assert_eq!(index.id_size(), IdentifierSize::U8);
        assert_eq!(index.class(class).unwrap().instance_size, 8);
    }
}
