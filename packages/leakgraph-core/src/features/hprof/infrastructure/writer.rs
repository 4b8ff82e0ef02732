//! Emits hprof records
//!
//! Identifiers wider than the dump's identifier size are truncated, the
//! inverse of the sign-extending reader.

use crate::errors::Result;
use crate::features::hprof::domain::{
    sub_tags, tags, GcRoot, HeapDumpRecord, HeapValue, HprofHeader, IdentifierSize,
    PrimitiveArrayValues,
};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Write};

/// Sequential hprof writer
pub struct HprofWriter<W: Write> {
    inner: W,
    id_size: IdentifierSize,
    bytes_written: u64,
}

impl<W: Write> HprofWriter<W> {
    /// Write the header and return a writer positioned after it
    pub fn new(mut inner: W, header: HprofHeader) -> Result<Self> {
        inner.write_all(header.version.header_string().as_bytes())?;
        inner.write_u8(0)?;
        inner.write_u32::<BigEndian>(header.identifier_size.bytes())?;
        inner.write_u64::<BigEndian>(header.timestamp_millis)?;
        Ok(Self {
            inner,
            id_size: header.identifier_size,
            bytes_written: header.byte_size(),
        })
    }

    pub fn id_size(&self) -> IdentifierSize {
        self.id_size
    }

    /// Bytes written so far, header included
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Raw top-level record
    pub fn write_record(&mut self, tag: u8, body: &[u8]) -> Result<()> {
        let length = u32::try_from(body.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "record body exceeds 4 GiB"))?;
        self.inner.write_u8(tag)?;
        self.inner.write_u32::<BigEndian>(0)?;
        self.inner.write_u32::<BigEndian>(length)?;
        self.inner.write_all(body)?;
        self.bytes_written += 9 + u64::from(length);
        Ok(())
    }

    pub fn write_string(&mut self, id: u64, value: &str) -> Result<()> {
        let mut body = Vec::with_capacity(self.id_size.bytes() as usize + value.len());
        write_id(&mut body, self.id_size, id)?;
        body.extend_from_slice(value.as_bytes());
        self.write_record(tags::STRING_IN_UTF8, &body)
    }

    pub fn write_load_class(
        &mut self,
        class_serial: u32,
        class_id: u64,
        stack_trace_serial: u32,
        class_name_string_id: u64,
    ) -> Result<()> {
        let mut body = Vec::new();
        body.write_u32::<BigEndian>(class_serial)?;
        write_id(&mut body, self.id_size, class_id)?;
        body.write_u32::<BigEndian>(stack_trace_serial)?;
        write_id(&mut body, self.id_size, class_name_string_id)?;
        self.write_record(tags::LOAD_CLASS, &body)
    }

    /// One HEAP_DUMP_SEGMENT holding `records`
    pub fn write_heap_dump_segment(&mut self, records: &[HeapDumpRecord]) -> Result<()> {
        let mut body = Vec::new();
        for record in records {
            encode_heap_dump_record(&mut body, self.id_size, record)?;
        }
        self.write_record(tags::HEAP_DUMP_SEGMENT, &body)
    }

    pub fn write_heap_dump_end(&mut self) -> Result<()> {
        self.write_record(tags::HEAP_DUMP_END, &[])
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Identifier truncated to `id_size`
pub fn write_id(out: &mut Vec<u8>, id_size: IdentifierSize, id: u64) -> io::Result<()> {
    match id_size {
        IdentifierSize::U1 => out.write_u8(id as u8),
        IdentifierSize::U2 => out.write_u16::<BigEndian>(id as u16),
        IdentifierSize::U4 => out.write_u32::<BigEndian>(id as u32),
        IdentifierSize::U8 => out.write_u64::<BigEndian>(id),
    }
}

/// Value bytes without a type tag, as stored in instance field data
pub fn write_value(out: &mut Vec<u8>, id_size: IdentifierSize, value: &HeapValue) -> io::Result<()> {
    match *value {
        HeapValue::Object(id) => write_id(out, id_size, id),
        HeapValue::Boolean(v) => out.write_u8(u8::from(v)),
        HeapValue::Char(v) => out.write_u16::<BigEndian>(v),
        HeapValue::Float(v) => out.write_u32::<BigEndian>(v.to_bits()),
        HeapValue::Double(v) => out.write_u64::<BigEndian>(v.to_bits()),
        HeapValue::Byte(v) => out.write_i8(v),
        HeapValue::Short(v) => out.write_i16::<BigEndian>(v),
        HeapValue::Int(v) => out.write_i32::<BigEndian>(v),
        HeapValue::Long(v) => out.write_i64::<BigEndian>(v),
    }
}

fn write_root(out: &mut Vec<u8>, id_size: IdentifierSize, root: &GcRoot) -> io::Result<()> {
    out.write_u8(root.sub_tag())?;
    write_id(out, id_size, root.object_id())?;
    match *root {
        GcRoot::JniGlobal { jni_global_ref_id, .. } => write_id(out, id_size, jni_global_ref_id)?,
        GcRoot::JniLocal {
            thread_serial,
            frame_number,
            ..
        }
        | GcRoot::JavaFrame {
            thread_serial,
            frame_number,
            ..
        } => {
            out.write_u32::<BigEndian>(thread_serial)?;
            out.write_u32::<BigEndian>(frame_number)?;
        }
        GcRoot::NativeStack { thread_serial, .. } | GcRoot::ThreadBlock { thread_serial, .. } => {
            out.write_u32::<BigEndian>(thread_serial)?
        }
        GcRoot::ThreadObject {
            thread_serial,
            stack_trace_serial,
            ..
        } => {
            out.write_u32::<BigEndian>(thread_serial)?;
            out.write_u32::<BigEndian>(stack_trace_serial)?;
        }
        GcRoot::JniMonitor {
            stack_trace_serial,
            stack_depth,
            ..
        } => {
            out.write_u32::<BigEndian>(stack_trace_serial)?;
            out.write_u32::<BigEndian>(stack_depth)?;
        }
        _ => {}
    }
    Ok(())
}

fn write_primitive_values(out: &mut Vec<u8>, values: &PrimitiveArrayValues) -> io::Result<()> {
    match values {
        PrimitiveArrayValues::Boolean(v) => v.iter().try_for_each(|&b| out.write_u8(u8::from(b))),
        PrimitiveArrayValues::Byte(v) => v.iter().try_for_each(|&b| out.write_i8(b)),
        PrimitiveArrayValues::Char(v) => v.iter().try_for_each(|&c| out.write_u16::<BigEndian>(c)),
        PrimitiveArrayValues::Short(v) => v.iter().try_for_each(|&s| out.write_i16::<BigEndian>(s)),
        PrimitiveArrayValues::Int(v) => v.iter().try_for_each(|&i| out.write_i32::<BigEndian>(i)),
        PrimitiveArrayValues::Long(v) => v.iter().try_for_each(|&l| out.write_i64::<BigEndian>(l)),
        PrimitiveArrayValues::Float(v) => v
            .iter()
            .try_for_each(|&f| out.write_u32::<BigEndian>(f.to_bits())),
        PrimitiveArrayValues::Double(v) => v
            .iter()
            .try_for_each(|&d| out.write_u64::<BigEndian>(d.to_bits())),
    }
}

/// Append one sub-record, tag included
pub fn encode_heap_dump_record(
    out: &mut Vec<u8>,
    id_size: IdentifierSize,
    record: &HeapDumpRecord,
) -> io::Result<()> {
    match record {
        HeapDumpRecord::GcRoot(root) => write_root(out, id_size, root)?,
        HeapDumpRecord::ClassDump(class) => {
            out.write_u8(sub_tags::CLASS_DUMP)?;
            write_id(out, id_size, class.id)?;
            out.write_u32::<BigEndian>(class.stack_trace_serial)?;
            write_id(out, id_size, class.superclass_id)?;
            write_id(out, id_size, class.class_loader_id)?;
            write_id(out, id_size, class.signers_id)?;
            write_id(out, id_size, class.protection_domain_id)?;
            write_id(out, id_size, 0)?;
            write_id(out, id_size, 0)?;
            out.write_u32::<BigEndian>(class.instance_size)?;

            out.write_u16::<BigEndian>(class.constant_pool.len() as u16)?;
            for (index, value) in &class.constant_pool {
                out.write_u16::<BigEndian>(*index)?;
                out.write_u8(value.field_type().tag())?;
                write_value(out, id_size, value)?;
            }
            out.write_u16::<BigEndian>(class.static_fields.len() as u16)?;
            for field in &class.static_fields {
                write_id(out, id_size, field.name_string_id)?;
                out.write_u8(field.value.field_type().tag())?;
                write_value(out, id_size, &field.value)?;
            }
            out.write_u16::<BigEndian>(class.fields.len() as u16)?;
            for field in &class.fields {
                write_id(out, id_size, field.name_string_id)?;
                out.write_u8(field.field_type.tag())?;
            }
        }
        HeapDumpRecord::InstanceDump(instance) => {
            out.write_u8(sub_tags::INSTANCE_DUMP)?;
            write_id(out, id_size, instance.id)?;
            out.write_u32::<BigEndian>(instance.stack_trace_serial)?;
            write_id(out, id_size, instance.class_id)?;
            out.write_u32::<BigEndian>(instance.field_values.len() as u32)?;
            out.extend_from_slice(&instance.field_values);
        }
        HeapDumpRecord::ObjectArrayDump(array) => {
            out.write_u8(sub_tags::OBJECT_ARRAY_DUMP)?;
            write_id(out, id_size, array.id)?;
            out.write_u32::<BigEndian>(array.stack_trace_serial)?;
            out.write_u32::<BigEndian>(array.element_ids.len() as u32)?;
            write_id(out, id_size, array.array_class_id)?;
            for &element in &array.element_ids {
                write_id(out, id_size, element)?;
            }
        }
        HeapDumpRecord::PrimitiveArrayDump(array) => {
            out.write_u8(sub_tags::PRIMITIVE_ARRAY_DUMP)?;
            write_id(out, id_size, array.id)?;
            out.write_u32::<BigEndian>(array.stack_trace_serial)?;
            out.write_u32::<BigEndian>(array.values.len() as u32)?;
            out.write_u8(array.values.primitive_type().tag())?;
            write_primitive_values(out, &array.values)?;
        }
        HeapDumpRecord::PrimitiveArrayNoData {
            id,
            stack_trace_serial,
            length,
            element_type,
        } => {
            out.write_u8(sub_tags::PRIMITIVE_ARRAY_NODATA)?;
            write_id(out, id_size, *id)?;
            out.write_u32::<BigEndian>(*stack_trace_serial)?;
            out.write_u32::<BigEndian>(*length)?;
            out.write_u8(element_type.tag())?;
        }
        HeapDumpRecord::HeapDumpInfo {
            heap_id,
            heap_name_string_id,
        } => {
            out.write_u8(sub_tags::HEAP_DUMP_INFO)?;
            out.write_u32::<BigEndian>(*heap_id)?;
            write_id(out, id_size, *heap_name_string_id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::hprof::domain::{HprofVersion, ObjectArrayDumpRecord};
    use crate::features::hprof::infrastructure::stream::HprofReader;
    use std::io::Cursor;

    #[test]
    fn test_header_layout() {
        let header = HprofHeader::new(HprofVersion::V1_0_2, IdentifierSize::U4, 7);
        let writer = HprofWriter::new(Vec::new(), header).unwrap();
        assert_eq!(writer.bytes_written(), 31);
        let bytes = writer.into_inner();
        assert_eq!(&bytes[..18], b"JAVA PROFILE 1.0.2");
        assert_eq!(bytes[18], 0);
        assert_eq!(&bytes[19..23], &[0, 0, 0, 4]);
    }

    #[test]
    fn test_ids_are_truncated_to_width() {
        let mut out = Vec::new();
        write_id(&mut out, IdentifierSize::U2, 0x1_2345).unwrap();
        assert_eq!(out, vec![0x23, 0x45]);
    }

    #[test]
    fn test_encoded_record_parses_back() {
        let record = HeapDumpRecord::ObjectArrayDump(ObjectArrayDumpRecord {
            id: 0x40,
            stack_trace_serial: 1,
            array_class_id: 0x10,
            element_ids: vec![0, 0x41, 0x42],
        });
        let mut out = Vec::new();
        encode_heap_dump_record(&mut out, IdentifierSize::U8, &record).unwrap();

        let len = out.len() as u64;
        let mut reader = HprofReader::new(Cursor::new(&out[..]), IdentifierSize::U8, 0, len);
        assert_eq!(reader.read_heap_dump_record().unwrap(), record);
        assert_eq!(reader.remaining(), 0);
    }
}
