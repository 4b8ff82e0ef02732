//! High-level authoring of synthetic heap dumps
//!
//! Classes, instances and arrays are declared by name; field layouts, string
//! ids and record encoding are resolved in [`HeapDumpBuilder::build`].
//!
//! # Example
//! ```
//! use leakgraph_core::features::hprof::{FieldType, GcRoot, HeapDumpBuilder, HeapValue};
//!
//! let mut builder = HeapDumpBuilder::new();
//! let node = builder.class("com.example.Node", &[("next", FieldType::Object)]);
//! let tail = builder.instance(node, &[]);
//! let head = builder.instance(node, &[("next", HeapValue::Object(tail))]);
//! builder.root(GcRoot::StickyClass { id: head });
//! let bytes = builder.build().unwrap();
//! assert!(bytes.starts_with(b"JAVA PROFILE 1.0.2"));
//! ```

use super::sources::InMemorySnapshotSource;
use super::writer::{write_value, HprofWriter};
use crate::errors::{LeakgraphError, Result};
use crate::features::hprof::domain::{
    ClassDumpRecord, FieldRecord, FieldType, GcRoot, HeapDumpRecord, HeapValue, HprofHeader,
    HprofVersion, IdentifierSize, InstanceDumpRecord, ObjectArrayDumpRecord,
    PrimitiveArrayDumpRecord, PrimitiveArrayValues, PrimitiveType, StaticFieldRecord,
};
use crate::shared::constants::jdk;
use rustc_hash::FxHashMap;

/// First id handed out; ids are sequential from here
const FIRST_ID: u64 = 0x100;

#[derive(Debug, Clone)]
struct ClassSpec {
    id: u64,
    name: String,
    superclass_id: u64,
    static_fields: Vec<(String, HeapValue)>,
    fields: Vec<(String, FieldType)>,
}

#[derive(Debug, Clone)]
enum PendingObject {
    Instance {
        id: u64,
        class_id: u64,
        values: Vec<(String, HeapValue)>,
    },
    ObjectArray {
        id: u64,
        array_class_id: u64,
        elements: Vec<u64>,
    },
    PrimitiveArray {
        id: u64,
        values: PrimitiveArrayValues,
    },
}

/// Authoring API for heap dumps
#[derive(Debug, Clone)]
pub struct HeapDumpBuilder {
    version: HprofVersion,
    id_size: IdentifierSize,
    timestamp_millis: u64,
    next_id: u64,
    classes: Vec<ClassSpec>,
    class_ids: FxHashMap<String, u64>,
    objects: Vec<PendingObject>,
    roots: Vec<GcRoot>,
    records_per_segment: Option<usize>,
    next_thread_serial: u32,
}

impl Default for HeapDumpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapDumpBuilder {
    /// 4-byte identifiers, `java.lang.Object` predeclared
    pub fn new() -> Self {
        Self::with_identifier_size(IdentifierSize::U4)
    }

    pub fn with_identifier_size(id_size: IdentifierSize) -> Self {
        let mut builder = Self {
            version: HprofVersion::V1_0_2,
            id_size,
            timestamp_millis: 0,
            next_id: FIRST_ID,
            classes: Vec::new(),
            class_ids: FxHashMap::default(),
            objects: Vec::new(),
            roots: Vec::new(),
            records_per_segment: None,
            next_thread_serial: 1,
        };
        builder.class_with_superclass(jdk::OBJECT, 0, &[]);
        builder
    }

    pub fn version(mut self, version: HprofVersion) -> Self {
        self.version = version;
        self
    }

    pub fn timestamp_millis(mut self, timestamp_millis: u64) -> Self {
        self.timestamp_millis = timestamp_millis;
        self
    }

    /// Split heap dump records across segments of at most `n` records
    pub fn records_per_segment(mut self, n: usize) -> Self {
        self.records_per_segment = Some(n.max(1));
        self
    }

    /// Allocate an id without defining an object, e.g. for dangling references
    pub fn reserve_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn object_class_id(&self) -> u64 {
        self.class_ids.get(jdk::OBJECT).copied().unwrap_or(0)
    }

    /// Id of a declared class
    pub fn class_id(&self, name: &str) -> Option<u64> {
        self.class_ids.get(name).copied()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Classes
    // ═══════════════════════════════════════════════════════════════════════

    /// Declare a direct subclass of `java.lang.Object`
    pub fn class(&mut self, name: &str, fields: &[(&str, FieldType)]) -> u64 {
        let object = self.object_class_id();
        self.class_with_superclass(name, object, fields)
    }

    /// Declare a class; returns the existing id if `name` was declared before
    pub fn class_with_superclass(
        &mut self,
        name: &str,
        superclass_id: u64,
        fields: &[(&str, FieldType)],
    ) -> u64 {
        if let Some(&id) = self.class_ids.get(name) {
            return id;
        }
        let id = self.reserve_id();
        self.classes.push(ClassSpec {
            id,
            name: name.to_string(),
            superclass_id,
            static_fields: Vec::new(),
            fields: fields
                .iter()
                .map(|(n, t)| (n.to_string(), *t))
                .collect(),
        });
        self.class_ids.insert(name.to_string(), id);
        id
    }

    /// Add or replace a static field of a declared class
    pub fn static_field(&mut self, class_id: u64, name: &str, value: HeapValue) -> Result<()> {
        let class = self
            .classes
            .iter_mut()
            .find(|c| c.id == class_id)
            .ok_or_else(|| LeakgraphError::object_not_found(class_id))?;
        match class.static_fields.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => class.static_fields.push((name.to_string(), value)),
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Objects
    // ═══════════════════════════════════════════════════════════════════════

    /// Instance of `class_id`; unnamed fields get zero values
    pub fn instance(&mut self, class_id: u64, values: &[(&str, HeapValue)]) -> u64 {
        let id = self.reserve_id();
        self.instance_with_id(id, class_id, values);
        id
    }

    /// Instance with a caller-chosen (previously reserved) id
    pub fn instance_with_id(&mut self, id: u64, class_id: u64, values: &[(&str, HeapValue)]) {
        self.objects.push(PendingObject::Instance {
            id,
            class_id,
            values: values.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        });
    }

    /// Object array whose class is named `<element_class>[]`
    pub fn object_array(&mut self, element_class: &str, elements: &[u64]) -> u64 {
        let array_class_name = format!("{}[]", element_class);
        let array_class_id = self.class(&array_class_name, &[]);
        let id = self.reserve_id();
        self.objects.push(PendingObject::ObjectArray {
            id,
            array_class_id,
            elements: elements.to_vec(),
        });
        id
    }

    pub fn primitive_array(&mut self, values: PrimitiveArrayValues) -> u64 {
        let id = self.reserve_id();
        self.objects.push(PendingObject::PrimitiveArray { id, values });
        id
    }

    /// `java.lang.String` backed by a `char[]`
    pub fn string(&mut self, value: &str) -> u64 {
        let string_class = self.class(
            jdk::STRING,
            &[
                ("value", FieldType::Object),
                ("hash", FieldType::Primitive(PrimitiveType::Int)),
            ],
        );
        let chars = self.primitive_array(PrimitiveArrayValues::Char(value.encode_utf16().collect()));
        self.instance(string_class, &[("value", HeapValue::Object(chars))])
    }

    /// `java.lang.Thread` named `name`, rooted as a thread object. Returns
    /// `(thread id, thread serial)`.
    pub fn thread(&mut self, name: &str) -> (u64, u32) {
        let thread_class = self.class(jdk::THREAD, &[("name", FieldType::Object)]);
        let name_id = self.string(name);
        let thread = self.instance(thread_class, &[("name", HeapValue::Object(name_id))]);
        let serial = self.next_thread_serial;
        self.next_thread_serial += 1;
        self.roots.push(GcRoot::ThreadObject {
            id: thread,
            thread_serial: serial,
            stack_trace_serial: 0,
        });
        (thread, serial)
    }

    pub fn root(&mut self, root: GcRoot) {
        self.roots.push(root);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Output
    // ═══════════════════════════════════════════════════════════════════════

    /// Encode the dump
    ///
    /// Fails when an instance names a field its class hierarchy does not
    /// declare, or references an undeclared class.
    pub fn build(&self) -> Result<Vec<u8>> {
        let header = HprofHeader::new(self.version, self.id_size, self.timestamp_millis);
        let mut writer = HprofWriter::new(Vec::new(), header)?;

        // String ids live in their own range above every object id
        let mut string_table: Vec<(u64, &str)> = Vec::new();
        let mut string_id_of: FxHashMap<&str, u64> = FxHashMap::default();
        for class in &self.classes {
            for name in std::iter::once(class.name.as_str())
                .chain(class.static_fields.iter().map(|(n, _)| n.as_str()))
                .chain(class.fields.iter().map(|(n, _)| n.as_str()))
            {
                if !string_id_of.contains_key(name) {
                    let id = self.next_id + 1 + string_table.len() as u64;
                    string_id_of.insert(name, id);
                    string_table.push((id, name));
                }
            }
        }

        for (id, value) in &string_table {
            writer.write_string(*id, &internal_class_name(value))?;
        }
        for (serial, class) in self.classes.iter().enumerate() {
            writer.write_load_class(serial as u32 + 1, class.id, 0, string_id_of[class.name.as_str()])?;
        }

        let records = self.heap_dump_records(&string_id_of)?;
        match self.records_per_segment {
            Some(n) => {
                for chunk in records.chunks(n) {
                    writer.write_heap_dump_segment(chunk)?;
                }
            }
            None => writer.write_heap_dump_segment(&records)?,
        }
        writer.write_heap_dump_end()?;
        Ok(writer.into_inner())
    }

    /// Encode into an in-memory source
    pub fn build_source(&self) -> Result<InMemorySnapshotSource> {
        Ok(InMemorySnapshotSource::new(self.build()?))
    }

    fn heap_dump_records(&self, string_id_of: &FxHashMap<&str, u64>) -> Result<Vec<HeapDumpRecord>> {
        let by_id: FxHashMap<u64, &ClassSpec> = self.classes.iter().map(|c| (c.id, c)).collect();
        let mut records = Vec::with_capacity(self.roots.len() + self.classes.len() + self.objects.len());

        records.extend(self.roots.iter().copied().map(HeapDumpRecord::GcRoot));

        for class in &self.classes {
            let instance_size = self.layout(&by_id, class.id)?.iter().map(|(_, t)| t.byte_size(self.id_size)).sum();
            records.push(HeapDumpRecord::ClassDump(ClassDumpRecord {
                id: class.id,
                stack_trace_serial: 0,
                superclass_id: class.superclass_id,
                class_loader_id: 0,
                signers_id: 0,
                protection_domain_id: 0,
                instance_size,
                constant_pool: Vec::new(),
                static_fields: class
                    .static_fields
                    .iter()
                    .map(|(name, value)| StaticFieldRecord {
                        name_string_id: string_id_of[name.as_str()],
                        value: *value,
                    })
                    .collect(),
                fields: class
                    .fields
                    .iter()
                    .map(|(name, field_type)| FieldRecord {
                        name_string_id: string_id_of[name.as_str()],
                        field_type: *field_type,
                    })
                    .collect(),
            }));
        }

        for object in &self.objects {
            records.push(match object {
                PendingObject::Instance { id, class_id, values } => {
                    HeapDumpRecord::InstanceDump(InstanceDumpRecord {
                        id: *id,
                        stack_trace_serial: 0,
                        class_id: *class_id,
                        field_values: self.encode_fields(&by_id, *class_id, values)?,
                    })
                }
                PendingObject::ObjectArray {
                    id,
                    array_class_id,
                    elements,
                } => HeapDumpRecord::ObjectArrayDump(ObjectArrayDumpRecord {
                    id: *id,
                    stack_trace_serial: 0,
                    array_class_id: *array_class_id,
                    element_ids: elements.clone(),
                }),
                PendingObject::PrimitiveArray { id, values } => {
                    HeapDumpRecord::PrimitiveArrayDump(PrimitiveArrayDumpRecord {
                        id: *id,
                        stack_trace_serial: 0,
                        values: values.clone(),
                    })
                }
            });
        }
        Ok(records)
    }

    /// Instance field layout, subclass fields first
    fn layout<'a>(
        &self,
        by_id: &FxHashMap<u64, &'a ClassSpec>,
        class_id: u64,
    ) -> Result<Vec<(&'a str, FieldType)>> {
        let mut layout = Vec::new();
        let mut current = class_id;
        while current != 0 {
            let class = by_id
                .get(&current)
                .ok_or_else(|| LeakgraphError::object_not_found(current))?;
            layout.extend(class.fields.iter().map(|(n, t)| (n.as_str(), *t)));
            current = class.superclass_id;
        }
        Ok(layout)
    }

    fn encode_fields(
        &self,
        by_id: &FxHashMap<u64, &ClassSpec>,
        class_id: u64,
        values: &[(String, HeapValue)],
    ) -> Result<Vec<u8>> {
        let layout = self.layout(by_id, class_id)?;
        for (name, _) in values {
            if !layout.iter().any(|(n, _)| n == name) {
                return Err(LeakgraphError::parse(
                    0,
                    format!("class 0x{:x} has no field '{}'", class_id, name),
                ));
            }
        }

        let mut out = Vec::new();
        // First declaration of a name (the most derived) receives the value
        let mut assigned: Vec<&str> = Vec::new();
        for (name, field_type) in layout {
            let explicit = if assigned.contains(&name) {
                None
            } else {
                values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
            };
            assigned.push(name);
            let value = explicit.unwrap_or_else(|| zero_value(field_type));
            if value.field_type() != field_type {
                return Err(LeakgraphError::parse(
                    0,
                    format!("field '{}' expects {:?}, got {:?}", name, field_type, value),
                ));
            }
            write_value(&mut out, self.id_size, &value)?;
        }
        Ok(out)
    }
}

fn zero_value(field_type: FieldType) -> HeapValue {
    match field_type {
        FieldType::Object => HeapValue::Object(0),
        FieldType::Primitive(p) => match p {
            PrimitiveType::Boolean => HeapValue::Boolean(false),
            PrimitiveType::Char => HeapValue::Char(0),
            PrimitiveType::Float => HeapValue::Float(0.0),
            PrimitiveType::Double => HeapValue::Double(0.0),
            PrimitiveType::Byte => HeapValue::Byte(0),
            PrimitiveType::Short => HeapValue::Short(0),
            PrimitiveType::Int => HeapValue::Int(0),
            PrimitiveType::Long => HeapValue::Long(0),
        },
    }
}

/// Dotted names are written in JVM internal form, as a JVM would
fn internal_class_name(name: &str) -> String {
    if name.contains('.') && !name.ends_with("[]") {
        name.replace('.', "/")
    } else {
        name.to_string()
    }
}
