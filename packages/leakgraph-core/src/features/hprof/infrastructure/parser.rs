//! Record-level parsing on top of [`HprofReader`]

use super::stream::HprofReader;
use crate::errors::{LeakgraphError, Result};
use crate::features::hprof::domain::{
    sub_tags, ClassDumpRecord, FieldRecord, GcRoot, HeapDumpRecord, HprofHeader, HprofVersion,
    IdentifierSize, InstanceDumpRecord, ObjectArrayDumpRecord, PrimitiveArrayDumpRecord,
    PrimitiveArrayValues, PrimitiveType, StaticFieldRecord,
};
use std::io::{Read, Seek};

/// Longest version string accepted before the NUL terminator
const MAX_VERSION_LEN: usize = 64;

/// `tag u8, time u32, length u32` prefix of a top-level record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub tag: u8,
    pub time_offset: u32,
    pub length: u32,
    /// Absolute offset of the tag byte
    pub position: u64,
}

impl RecordHeader {
    pub const SIZE: u64 = 9;

    /// Absolute offset one past the record body
    pub fn end(&self) -> u64 {
        self.position + Self::SIZE + u64::from(self.length)
    }
}

impl<R: Read + Seek> HprofReader<R> {
    /// Parse the dump header and adopt its identifier size
    pub fn read_header(&mut self) -> Result<HprofHeader> {
        let start = self.position();
        let mut version = Vec::new();
        loop {
            let byte = self.read_u8()?;
            if byte == 0 {
                break;
            }
            if version.len() == MAX_VERSION_LEN {
                return Err(LeakgraphError::parse(start, "header version string is not terminated"));
            }
            version.push(byte);
        }
        let version_str = String::from_utf8_lossy(&version);
        let version = HprofVersion::from_header_string(&version_str).ok_or_else(|| {
            LeakgraphError::parse(start, format!("unsupported format '{}'", version_str))
        })?;

        let size_at = self.position();
        let raw_size = self.read_u32()?;
        let identifier_size = IdentifierSize::from_u32(raw_size).ok_or_else(|| {
            LeakgraphError::parse(size_at, format!("unsupported identifier size {}", raw_size))
        })?;
        let timestamp_millis = self.read_u64()?;

        self.set_id_size(identifier_size);
        Ok(HprofHeader::new(version, identifier_size, timestamp_millis))
    }

    pub fn read_record_header(&mut self) -> Result<RecordHeader> {
        let position = self.position();
        let tag = self.read_u8()?;
        let time_offset = self.read_u32()?;
        let length = self.read_u32()?;
        Ok(RecordHeader {
            tag,
            time_offset,
            length,
            position,
        })
    }

    /// Body of a root sub-record whose tag was already consumed
    pub fn read_gc_root(&mut self, tag: u8, tag_position: u64) -> Result<GcRoot> {
        let id = self.read_id()?;
        Ok(match tag {
            sub_tags::ROOT_UNKNOWN => GcRoot::Unknown { id },
            sub_tags::ROOT_JNI_GLOBAL => GcRoot::JniGlobal {
                id,
                jni_global_ref_id: self.read_id()?,
            },
            sub_tags::ROOT_JNI_LOCAL => GcRoot::JniLocal {
                id,
                thread_serial: self.read_u32()?,
                frame_number: self.read_u32()?,
            },
            sub_tags::ROOT_JAVA_FRAME => GcRoot::JavaFrame {
                id,
                thread_serial: self.read_u32()?,
                frame_number: self.read_u32()?,
            },
            sub_tags::ROOT_NATIVE_STACK => GcRoot::NativeStack {
                id,
                thread_serial: self.read_u32()?,
            },
            sub_tags::ROOT_STICKY_CLASS => GcRoot::StickyClass { id },
            sub_tags::ROOT_THREAD_BLOCK => GcRoot::ThreadBlock {
                id,
                thread_serial: self.read_u32()?,
            },
            sub_tags::ROOT_MONITOR_USED => GcRoot::MonitorUsed { id },
            sub_tags::ROOT_THREAD_OBJECT => GcRoot::ThreadObject {
                id,
                thread_serial: self.read_u32()?,
                stack_trace_serial: self.read_u32()?,
            },
            sub_tags::ROOT_INTERNED_STRING => GcRoot::InternedString { id },
            sub_tags::ROOT_FINALIZING => GcRoot::Finalizing { id },
            sub_tags::ROOT_DEBUGGER => GcRoot::Debugger { id },
            sub_tags::ROOT_REFERENCE_CLEANUP => GcRoot::ReferenceCleanup { id },
            sub_tags::ROOT_VM_INTERNAL => GcRoot::VmInternal { id },
            sub_tags::ROOT_JNI_MONITOR => GcRoot::JniMonitor {
                id,
                stack_trace_serial: self.read_u32()?,
                stack_depth: self.read_u32()?,
            },
            sub_tags::ROOT_UNREACHABLE => GcRoot::Unreachable { id },
            other => {
                return Err(LeakgraphError::parse(
                    tag_position,
                    format!("unknown root sub-record tag 0x{:02x}", other),
                ))
            }
        })
    }

    pub fn read_class_dump(&mut self) -> Result<ClassDumpRecord> {
        let id = self.read_id()?;
        let stack_trace_serial = self.read_u32()?;
        let superclass_id = self.read_id()?;
        let class_loader_id = self.read_id()?;
        let signers_id = self.read_id()?;
        let protection_domain_id = self.read_id()?;
        // reserved
        self.read_id()?;
        self.read_id()?;
        let instance_size = self.read_u32()?;

        let constant_pool_count = self.read_u16()?;
        let mut constant_pool = Vec::with_capacity(usize::from(constant_pool_count));
        for _ in 0..constant_pool_count {
            let index = self.read_u16()?;
            let field_type = self.read_field_type()?;
            constant_pool.push((index, self.read_value(field_type)?));
        }

        let static_count = self.read_u16()?;
        let mut static_fields = Vec::with_capacity(usize::from(static_count));
        for _ in 0..static_count {
            let name_string_id = self.read_id()?;
            let field_type = self.read_field_type()?;
            static_fields.push(StaticFieldRecord {
                name_string_id,
                value: self.read_value(field_type)?,
            });
        }

        let field_count = self.read_u16()?;
        let mut fields = Vec::with_capacity(usize::from(field_count));
        for _ in 0..field_count {
            fields.push(FieldRecord {
                name_string_id: self.read_id()?,
                field_type: self.read_field_type()?,
            });
        }

        Ok(ClassDumpRecord {
            id,
            stack_trace_serial,
            superclass_id,
            class_loader_id,
            signers_id,
            protection_domain_id,
            instance_size,
            constant_pool,
            static_fields,
            fields,
        })
    }

    pub fn read_instance_dump(&mut self) -> Result<InstanceDumpRecord> {
        let id = self.read_id()?;
        let stack_trace_serial = self.read_u32()?;
        let class_id = self.read_id()?;
        let length = self.read_u32()?;
        let field_values = self.read_bytes(length as usize)?;
        Ok(InstanceDumpRecord {
            id,
            stack_trace_serial,
            class_id,
            field_values,
        })
    }

    pub fn read_object_array_dump(&mut self) -> Result<ObjectArrayDumpRecord> {
        let id = self.read_id()?;
        let stack_trace_serial = self.read_u32()?;
        let count = self.read_u32()?;
        let array_class_id = self.read_id()?;
        self.ensure_elements(count, self.id_size().bytes())?;
        let mut element_ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            element_ids.push(self.read_id()?);
        }
        Ok(ObjectArrayDumpRecord {
            id,
            stack_trace_serial,
            array_class_id,
            element_ids,
        })
    }

    pub fn read_primitive_array_dump(&mut self) -> Result<PrimitiveArrayDumpRecord> {
        let id = self.read_id()?;
        let stack_trace_serial = self.read_u32()?;
        let count = self.read_u32()?;
        let element_type = self.read_primitive_type()?;
        self.ensure_elements(count, element_type.byte_size())?;

        let n = count as usize;
        let values = match element_type {
            PrimitiveType::Boolean => {
                PrimitiveArrayValues::Boolean(self.read_bytes(n)?.into_iter().map(|b| b != 0).collect())
            }
            PrimitiveType::Byte => {
                PrimitiveArrayValues::Byte(self.read_bytes(n)?.into_iter().map(|b| b as i8).collect())
            }
            PrimitiveType::Char => {
                PrimitiveArrayValues::Char((0..n).map(|_| self.read_u16()).collect::<Result<_>>()?)
            }
            PrimitiveType::Short => {
                PrimitiveArrayValues::Short((0..n).map(|_| self.read_i16()).collect::<Result<_>>()?)
            }
            PrimitiveType::Int => {
                PrimitiveArrayValues::Int((0..n).map(|_| self.read_i32()).collect::<Result<_>>()?)
            }
            PrimitiveType::Long => {
                PrimitiveArrayValues::Long((0..n).map(|_| self.read_i64()).collect::<Result<_>>()?)
            }
            PrimitiveType::Float => PrimitiveArrayValues::Float(
                (0..n)
                    .map(|_| self.read_u32().map(f32::from_bits))
                    .collect::<Result<_>>()?,
            ),
            PrimitiveType::Double => PrimitiveArrayValues::Double(
                (0..n)
                    .map(|_| self.read_u64().map(f64::from_bits))
                    .collect::<Result<_>>()?,
            ),
        };

        Ok(PrimitiveArrayDumpRecord {
            id,
            stack_trace_serial,
            values,
        })
    }

    /// Read one heap dump sub-record, tag included
    pub fn read_heap_dump_record(&mut self) -> Result<HeapDumpRecord> {
        let tag_position = self.position();
        let tag = self.read_u8()?;
        Ok(match tag {
            sub_tags::CLASS_DUMP => HeapDumpRecord::ClassDump(self.read_class_dump()?),
            sub_tags::INSTANCE_DUMP => HeapDumpRecord::InstanceDump(self.read_instance_dump()?),
            sub_tags::OBJECT_ARRAY_DUMP => {
                HeapDumpRecord::ObjectArrayDump(self.read_object_array_dump()?)
            }
            sub_tags::PRIMITIVE_ARRAY_DUMP => {
                HeapDumpRecord::PrimitiveArrayDump(self.read_primitive_array_dump()?)
            }
            sub_tags::PRIMITIVE_ARRAY_NODATA => HeapDumpRecord::PrimitiveArrayNoData {
                id: self.read_id()?,
                stack_trace_serial: self.read_u32()?,
                length: self.read_u32()?,
                element_type: self.read_primitive_type()?,
            },
            sub_tags::HEAP_DUMP_INFO => HeapDumpRecord::HeapDumpInfo {
                heap_id: self.read_u32()?,
                heap_name_string_id: self.read_id()?,
            },
            root_tag if is_root_tag(root_tag) => {
                HeapDumpRecord::GcRoot(self.read_gc_root(root_tag, tag_position)?)
            }
            other => {
                return Err(LeakgraphError::parse(
                    tag_position,
                    format!("unknown heap dump sub-record tag 0x{:02x}", other),
                ))
            }
        })
    }

    /// Fail before allocating when `count` elements cannot fit in what is left
    fn ensure_elements(&self, count: u32, width: u32) -> Result<()> {
        let needed = u64::from(count) * u64::from(width);
        if needed > self.remaining() {
            return Err(LeakgraphError::parse(
                self.position(),
                format!("array of {} bytes overruns its record", needed),
            ));
        }
        Ok(())
    }
}

pub fn is_root_tag(tag: u8) -> bool {
    matches!(
        tag,
        sub_tags::ROOT_UNKNOWN
            | sub_tags::ROOT_JNI_GLOBAL..=sub_tags::ROOT_THREAD_OBJECT
            | sub_tags::ROOT_INTERNED_STRING..=sub_tags::ROOT_JNI_MONITOR
            | sub_tags::ROOT_UNREACHABLE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(bytes: &[u8]) -> HprofReader<Cursor<&[u8]>> {
        HprofReader::new(Cursor::new(bytes), IdentifierSize::U4, 0, bytes.len() as u64)
    }

    #[test]
    fn test_read_header() {
        let mut bytes = b"JAVA PROFILE 1.0.2\0".to_vec();
        bytes.extend_from_slice(&8u32.to_be_bytes());
        bytes.extend_from_slice(&1_700_000_000_000u64.to_be_bytes());
        let mut r = reader(&bytes);
        let header = r.read_header().unwrap();
        assert_eq!(header.version, HprofVersion::V1_0_2);
        assert_eq!(header.identifier_size, IdentifierSize::U8);
        assert_eq!(header.timestamp_millis, 1_700_000_000_000);
        assert_eq!(r.id_size(), IdentifierSize::U8);
        assert_eq!(r.position(), header.byte_size());
    }

    #[test]
    fn test_header_rejects_odd_identifier_size() {
        let mut bytes = b"JAVA PROFILE 1.0.2\0".to_vec();
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(&0u64.to_be_bytes());
        let err = reader(&bytes).read_header().unwrap_err();
        assert_eq!(err.offset(), Some(19));
    }

    #[test]
    fn test_unknown_sub_record_tag() {
        let bytes = [0x42u8, 0, 0, 0, 0];
        let err = reader(&bytes).read_heap_dump_record().unwrap_err();
        assert_eq!(err.offset(), Some(0));
        assert!(err.to_string().contains("0x42"));
    }

    #[test]
    fn test_thread_object_root() {
        let mut bytes = vec![sub_tags::ROOT_THREAD_OBJECT];
        bytes.extend_from_slice(&5u32.to_be_bytes());
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        let record = reader(&bytes).read_heap_dump_record().unwrap();
        assert_eq!(
            record,
            HeapDumpRecord::GcRoot(GcRoot::ThreadObject {
                id: 5,
                thread_serial: 2,
                stack_trace_serial: 0
            })
        );
    }

    #[test]
    fn test_object_array_overrun_is_parse_error() {
        let mut bytes = vec![sub_tags::OBJECT_ARRAY_DUMP];
        bytes.extend_from_slice(&9u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&1000u32.to_be_bytes());
        bytes.extend_from_slice(&3u32.to_be_bytes());
        assert!(reader(&bytes).read_heap_dump_record().is_err());
    }

    #[test]
    fn test_char_array_values() {
        let mut bytes = vec![sub_tags::PRIMITIVE_ARRAY_DUMP];
        bytes.extend_from_slice(&9u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.push(PrimitiveType::Char.tag());
        bytes.extend_from_slice(&[0x00, 0x68, 0x00, 0x69]);
        match reader(&bytes).read_heap_dump_record().unwrap() {
            HeapDumpRecord::PrimitiveArrayDump(array) => {
                assert_eq!(array.id, 9);
                assert_eq!(array.values, PrimitiveArrayValues::Char(vec![0x68, 0x69]));
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_root_tag_ranges() {
        assert!(is_root_tag(0xFF));
        assert!(is_root_tag(0x08));
        assert!(is_root_tag(0x8E));
        assert!(!is_root_tag(0x8F));
        assert!(!is_root_tag(0x20));
        assert!(!is_root_tag(0x0A));
    }
}
