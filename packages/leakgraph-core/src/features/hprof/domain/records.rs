//! On-disk record kinds
//!
//! Top-level records are `tag u8, time u32, length u32, body`. Heap dump
//! segments contain a sequence of sub-records with no length prefix; their
//! size follows from the identifier size and the declared counts.

use super::types::{FieldType, HeapValue, PrimitiveType};
use serde::{Deserialize, Serialize};

/// Top-level record tags
pub mod tags {
    pub const STRING_IN_UTF8: u8 = 0x01;
    pub const LOAD_CLASS: u8 = 0x02;
    pub const UNLOAD_CLASS: u8 = 0x03;
    pub const STACK_FRAME: u8 = 0x04;
    pub const STACK_TRACE: u8 = 0x05;
    pub const ALLOC_SITES: u8 = 0x06;
    pub const HEAP_SUMMARY: u8 = 0x07;
    pub const START_THREAD: u8 = 0x0A;
    pub const END_THREAD: u8 = 0x0B;
    pub const HEAP_DUMP: u8 = 0x0C;
    pub const CPU_SAMPLES: u8 = 0x0D;
    pub const CONTROL_SETTINGS: u8 = 0x0E;
    pub const HEAP_DUMP_SEGMENT: u8 = 0x1C;
    pub const HEAP_DUMP_END: u8 = 0x2C;

    /// Records the indexer skips by their declared length
    pub const SKIPPED: [u8; 9] = [
        UNLOAD_CLASS,
        STACK_FRAME,
        STACK_TRACE,
        ALLOC_SITES,
        HEAP_SUMMARY,
        START_THREAD,
        END_THREAD,
        CPU_SAMPLES,
        CONTROL_SETTINGS,
    ];
}

/// Heap dump sub-record tags
pub mod sub_tags {
    pub const ROOT_UNKNOWN: u8 = 0xFF;
    pub const ROOT_JNI_GLOBAL: u8 = 0x01;
    pub const ROOT_JNI_LOCAL: u8 = 0x02;
    pub const ROOT_JAVA_FRAME: u8 = 0x03;
    pub const ROOT_NATIVE_STACK: u8 = 0x04;
    pub const ROOT_STICKY_CLASS: u8 = 0x05;
    pub const ROOT_THREAD_BLOCK: u8 = 0x06;
    pub const ROOT_MONITOR_USED: u8 = 0x07;
    pub const ROOT_THREAD_OBJECT: u8 = 0x08;
    pub const ROOT_INTERNED_STRING: u8 = 0x89;
    pub const ROOT_FINALIZING: u8 = 0x8A;
    pub const ROOT_DEBUGGER: u8 = 0x8B;
    pub const ROOT_REFERENCE_CLEANUP: u8 = 0x8C;
    pub const ROOT_VM_INTERNAL: u8 = 0x8D;
    pub const ROOT_JNI_MONITOR: u8 = 0x8E;
    pub const ROOT_UNREACHABLE: u8 = 0x90;
    pub const CLASS_DUMP: u8 = 0x20;
    pub const INSTANCE_DUMP: u8 = 0x21;
    pub const OBJECT_ARRAY_DUMP: u8 = 0x22;
    pub const PRIMITIVE_ARRAY_DUMP: u8 = 0x23;
    pub const PRIMITIVE_ARRAY_NODATA: u8 = 0xC3;
    pub const HEAP_DUMP_INFO: u8 = 0xFE;
}

/// Kind of a GC root, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GcRootKind {
    ThreadObject,
    JniGlobal,
    JniLocal,
    JavaFrame,
    NativeStack,
    StickyClass,
    ThreadBlock,
    MonitorUsed,
    InternedString,
    Finalizing,
    Debugger,
    ReferenceCleanup,
    VmInternal,
    JniMonitor,
    Unreachable,
    Unknown,
}

impl GcRootKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThreadObject => "Thread object",
            Self::JniGlobal => "Global variable in native code",
            Self::JniLocal => "Local variable in native code",
            Self::JavaFrame => "Java local variable",
            Self::NativeStack => "Input or output parameters in native code",
            Self::StickyClass => "System class",
            Self::ThreadBlock => "Thread block",
            Self::MonitorUsed => "Monitor (anything that called the wait() or notify() methods, or that is synchronized.)",
            Self::InternedString => "Interned string",
            Self::Finalizing => "Finalizing",
            Self::Debugger => "Debugger",
            Self::ReferenceCleanup => "Reference cleanup",
            Self::VmInternal => "VM internal",
            Self::JniMonitor => "JNI monitor",
            Self::Unreachable => "Unreachable",
            Self::Unknown => "Unknown",
        }
    }
}

/// GC root declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GcRoot {
    Unknown { id: u64 },
    JniGlobal { id: u64, jni_global_ref_id: u64 },
    JniLocal { id: u64, thread_serial: u32, frame_number: u32 },
    JavaFrame { id: u64, thread_serial: u32, frame_number: u32 },
    NativeStack { id: u64, thread_serial: u32 },
    StickyClass { id: u64 },
    ThreadBlock { id: u64, thread_serial: u32 },
    MonitorUsed { id: u64 },
    ThreadObject { id: u64, thread_serial: u32, stack_trace_serial: u32 },
    InternedString { id: u64 },
    Finalizing { id: u64 },
    Debugger { id: u64 },
    ReferenceCleanup { id: u64 },
    VmInternal { id: u64 },
    JniMonitor { id: u64, stack_trace_serial: u32, stack_depth: u32 },
    Unreachable { id: u64 },
}

impl GcRoot {
    /// Id of the object kept alive by this root
    pub fn object_id(&self) -> u64 {
        match *self {
            Self::Unknown { id }
            | Self::JniGlobal { id, .. }
            | Self::JniLocal { id, .. }
            | Self::JavaFrame { id, .. }
            | Self::NativeStack { id, .. }
            | Self::StickyClass { id }
            | Self::ThreadBlock { id, .. }
            | Self::MonitorUsed { id }
            | Self::ThreadObject { id, .. }
            | Self::InternedString { id }
            | Self::Finalizing { id }
            | Self::Debugger { id }
            | Self::ReferenceCleanup { id }
            | Self::VmInternal { id }
            | Self::JniMonitor { id, .. }
            | Self::Unreachable { id } => id,
        }
    }

    pub fn kind(&self) -> GcRootKind {
        match self {
            Self::Unknown { .. } => GcRootKind::Unknown,
            Self::JniGlobal { .. } => GcRootKind::JniGlobal,
            Self::JniLocal { .. } => GcRootKind::JniLocal,
            Self::JavaFrame { .. } => GcRootKind::JavaFrame,
            Self::NativeStack { .. } => GcRootKind::NativeStack,
            Self::StickyClass { .. } => GcRootKind::StickyClass,
            Self::ThreadBlock { .. } => GcRootKind::ThreadBlock,
            Self::MonitorUsed { .. } => GcRootKind::MonitorUsed,
            Self::ThreadObject { .. } => GcRootKind::ThreadObject,
            Self::InternedString { .. } => GcRootKind::InternedString,
            Self::Finalizing { .. } => GcRootKind::Finalizing,
            Self::Debugger { .. } => GcRootKind::Debugger,
            Self::ReferenceCleanup { .. } => GcRootKind::ReferenceCleanup,
            Self::VmInternal { .. } => GcRootKind::VmInternal,
            Self::JniMonitor { .. } => GcRootKind::JniMonitor,
            Self::Unreachable { .. } => GcRootKind::Unreachable,
        }
    }

    /// Serial of the thread owning a stack-scoped root
    pub fn thread_serial(&self) -> Option<u32> {
        match *self {
            Self::JniLocal { thread_serial, .. }
            | Self::JavaFrame { thread_serial, .. }
            | Self::NativeStack { thread_serial, .. }
            | Self::ThreadBlock { thread_serial, .. }
            | Self::ThreadObject { thread_serial, .. } => Some(thread_serial),
            _ => None,
        }
    }

    pub fn sub_tag(&self) -> u8 {
        match self {
            Self::Unknown { .. } => sub_tags::ROOT_UNKNOWN,
            Self::JniGlobal { .. } => sub_tags::ROOT_JNI_GLOBAL,
            Self::JniLocal { .. } => sub_tags::ROOT_JNI_LOCAL,
            Self::JavaFrame { .. } => sub_tags::ROOT_JAVA_FRAME,
            Self::NativeStack { .. } => sub_tags::ROOT_NATIVE_STACK,
            Self::StickyClass { .. } => sub_tags::ROOT_STICKY_CLASS,
            Self::ThreadBlock { .. } => sub_tags::ROOT_THREAD_BLOCK,
            Self::MonitorUsed { .. } => sub_tags::ROOT_MONITOR_USED,
            Self::ThreadObject { .. } => sub_tags::ROOT_THREAD_OBJECT,
            Self::InternedString { .. } => sub_tags::ROOT_INTERNED_STRING,
            Self::Finalizing { .. } => sub_tags::ROOT_FINALIZING,
            Self::Debugger { .. } => sub_tags::ROOT_DEBUGGER,
            Self::ReferenceCleanup { .. } => sub_tags::ROOT_REFERENCE_CLEANUP,
            Self::VmInternal { .. } => sub_tags::ROOT_VM_INTERNAL,
            Self::JniMonitor { .. } => sub_tags::ROOT_JNI_MONITOR,
            Self::Unreachable { .. } => sub_tags::ROOT_UNREACHABLE,
        }
    }
}

/// Static field entry of a class dump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticFieldRecord {
    pub name_string_id: u64,
    pub value: HeapValue,
}

/// Instance field declaration of a class dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name_string_id: u64,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDumpRecord {
    pub id: u64,
    pub stack_trace_serial: u32,
    pub superclass_id: u64,
    pub class_loader_id: u64,
    pub signers_id: u64,
    pub protection_domain_id: u64,
    pub instance_size: u32,
    pub constant_pool: Vec<(u16, HeapValue)>,
    pub static_fields: Vec<StaticFieldRecord>,
    pub fields: Vec<FieldRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDumpRecord {
    pub id: u64,
    pub stack_trace_serial: u32,
    pub class_id: u64,
    /// Raw field values, subclass fields first
    pub field_values: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectArrayDumpRecord {
    pub id: u64,
    pub stack_trace_serial: u32,
    pub array_class_id: u64,
    pub element_ids: Vec<u64>,
}

/// Values of a primitive array, one variant per element type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrimitiveArrayValues {
    Boolean(Vec<bool>),
    Char(Vec<u16>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
}

impl PrimitiveArrayValues {
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Self::Boolean(_) => PrimitiveType::Boolean,
            Self::Char(_) => PrimitiveType::Char,
            Self::Float(_) => PrimitiveType::Float,
            Self::Double(_) => PrimitiveType::Double,
            Self::Byte(_) => PrimitiveType::Byte,
            Self::Short(_) => PrimitiveType::Short,
            Self::Int(_) => PrimitiveType::Int,
            Self::Long(_) => PrimitiveType::Long,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Char(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Byte(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Long(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveArrayDumpRecord {
    pub id: u64,
    pub stack_trace_serial: u32,
    pub values: PrimitiveArrayValues,
}

/// Sub-record of a HEAP_DUMP / HEAP_DUMP_SEGMENT record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeapDumpRecord {
    GcRoot(GcRoot),
    ClassDump(ClassDumpRecord),
    InstanceDump(InstanceDumpRecord),
    ObjectArrayDump(ObjectArrayDumpRecord),
    PrimitiveArrayDump(PrimitiveArrayDumpRecord),
    PrimitiveArrayNoData {
        id: u64,
        stack_trace_serial: u32,
        length: u32,
        element_type: PrimitiveType,
    },
    HeapDumpInfo {
        heap_id: u32,
        heap_name_string_id: u64,
    },
}

impl HeapDumpRecord {
    /// Id of the object this sub-record defines, `None` for roots and info
    pub fn object_id(&self) -> Option<u64> {
        match self {
            Self::ClassDump(r) => Some(r.id),
            Self::InstanceDump(r) => Some(r.id),
            Self::ObjectArrayDump(r) => Some(r.id),
            Self::PrimitiveArrayDump(r) => Some(r.id),
            Self::PrimitiveArrayNoData { id, .. } => Some(*id),
            Self::GcRoot(_) | Self::HeapDumpInfo { .. } => None,
        }
    }
}

/// Top-level record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    String {
        id: u64,
        value: String,
    },
    LoadClass {
        class_serial: u32,
        class_id: u64,
        stack_trace_serial: u32,
        class_name_string_id: u64,
    },
    /// One HEAP_DUMP_SEGMENT holding these sub-records
    HeapDumpSegment(Vec<HeapDumpRecord>),
    HeapDumpEnd,
}
