//! Random-access index produced by one indexing pass

use crate::errors::{LeakgraphError, Result};
use crate::features::hprof::domain::{
    ClassDef, GcRoot, HeapDumpRecord, HprofHeader, IdentifierSize, IndexedObject, ObjectKind,
};
use crate::features::hprof::infrastructure::HprofReader;
use crate::features::hprof::ports::SnapshotSource;
use crate::shared::collections::LongObjectScatterMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::io::{self, Cursor};

/// Number of indexed objects per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCounts {
    pub classes: u64,
    pub instances: u64,
    pub object_arrays: u64,
    pub primitive_arrays: u64,
}

impl ObjectCounts {
    pub fn total(&self) -> u64 {
        self.classes + self.instances + self.object_arrays + self.primitive_arrays
    }

    pub(crate) fn bump(&mut self, kind: ObjectKind) {
        match kind {
            ObjectKind::Class => self.classes += 1,
            ObjectKind::Instance => self.instances += 1,
            ObjectKind::ObjectArray => self.object_arrays += 1,
            ObjectKind::PrimitiveArray => self.primitive_arrays += 1,
        }
    }
}

/// Immutable index over one heap dump
///
/// Holds object positions, the materialized class table and the GC roots;
/// field values stay in the source and are re-read on demand.
#[derive(Debug)]
pub struct HprofIndex {
    pub(crate) header: HprofHeader,
    pub(crate) objects: LongObjectScatterMap<IndexedObject>,
    pub(crate) classes: FxHashMap<u64, ClassDef>,
    pub(crate) class_names: FxHashMap<String, u64>,
    pub(crate) gc_roots: Vec<GcRoot>,
    pub(crate) thread_objects: FxHashMap<u32, u64>,
    pub(crate) strings: FxHashMap<u64, String>,
    pub(crate) counts: ObjectCounts,
    pub(crate) source_len: u64,
}

impl HprofIndex {
    pub fn header(&self) -> &HprofHeader {
        &self.header
    }

    #[inline]
    pub fn id_size(&self) -> IdentifierSize {
        self.header.identifier_size
    }

    #[inline]
    pub fn get(&self, object_id: u64) -> Option<IndexedObject> {
        self.objects.get(object_id).copied()
    }

    #[inline]
    pub fn contains(&self, object_id: u64) -> bool {
        self.objects.contains_key(object_id)
    }

    /// Every indexed object, in no particular order
    pub fn objects(&self) -> impl Iterator<Item = (u64, IndexedObject)> + '_ {
        self.objects.iter().map(|(id, entry)| (id, *entry))
    }

    pub fn object_count(&self) -> usize {
        self.objects.size()
    }

    pub fn counts(&self) -> ObjectCounts {
        self.counts
    }

    pub fn class(&self, class_id: u64) -> Option<&ClassDef> {
        self.classes.get(&class_id)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> + '_ {
        self.classes.values()
    }

    /// Class id for a dotted name; the first class dumped wins on duplicates
    pub fn class_id_by_name(&self, name: &str) -> Option<u64> {
        self.class_names.get(name).copied()
    }

    /// GC roots in dump order
    pub fn gc_roots(&self) -> &[GcRoot] {
        &self.gc_roots
    }

    /// Thread object declared by `ROOT_THREAD_OBJECT` with this serial
    pub fn thread_object_id(&self, thread_serial: u32) -> Option<u64> {
        self.thread_objects.get(&thread_serial).copied()
    }

    /// Retained string table entry
    pub fn string(&self, string_id: u64) -> Option<&str> {
        self.strings.get(&string_id).map(String::as_str)
    }

    pub fn source_len(&self) -> u64 {
        self.source_len
    }

    /// Re-read and fully parse the sub-record defining `object_id`
    ///
    /// One positioned read of exactly `record_size` bytes; no cursor is
    /// shared, so concurrent callers are fine.
    pub fn read_record(&self, source: &dyn SnapshotSource, object_id: u64) -> Result<HeapDumpRecord> {
        let entry = self
            .get(object_id)
            .ok_or_else(|| LeakgraphError::object_not_found(object_id))?;
        let position = entry.position();
        let mut buf = vec![0u8; entry.record_size() as usize];
        source.read_exact_at(position, &mut buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                LeakgraphError::parse(position, "record extends past the end of the source")
            } else {
                LeakgraphError::Io(e)
            }
        })?;

        let limit = position + buf.len() as u64;
        let mut reader = HprofReader::new(Cursor::new(&buf[..]), self.id_size(), position, limit);
        let record = reader.read_heap_dump_record()?;
        if record.object_id() != Some(object_id) {
            return Err(LeakgraphError::graph_integrity(object_id, "hydration"));
        }
        Ok(record)
    }
}
