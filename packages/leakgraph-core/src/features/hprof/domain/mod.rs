//! hprof domain models

pub mod indexed;
pub mod records;
pub mod types;

pub use indexed::{ClassDef, FieldDef, IndexedObject, ObjectKind, StaticField};
pub use records::{
    sub_tags, tags, ClassDumpRecord, FieldRecord, GcRoot, GcRootKind, HeapDumpRecord,
    InstanceDumpRecord, ObjectArrayDumpRecord, PrimitiveArrayDumpRecord, PrimitiveArrayValues,
    Record, StaticFieldRecord,
};
pub use types::{
    normalize_class_name, FieldType, HeapValue, HprofHeader, HprofVersion, IdentifierSize,
    PrimitiveType,
};
