//! Buffered sequential access and big-endian primitive decoding
//!
//! [`SourceStream`] turns positioned reads into a `Read + Seek` stream for the
//! single indexing pass. [`HprofReader`] decodes hprof primitives from any
//! `Read + Seek`, tracking the absolute offset so every parse error can say
//! where the data ran out.

use crate::errors::{LeakgraphError, Result};
use crate::features::hprof::domain::{FieldType, HeapValue, IdentifierSize, PrimitiveType};
use crate::features::hprof::ports::SnapshotSource;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read, Seek, SeekFrom};

// ═══════════════════════════════════════════════════════════════════════════
// SourceStream
// ═══════════════════════════════════════════════════════════════════════════

/// Sequential reader with a fixed-size read-ahead buffer over a [`SnapshotSource`]
pub struct SourceStream<'a> {
    source: &'a dyn SnapshotSource,
    buf: Vec<u8>,
    /// Absolute offset of `buf[0]`
    buf_start: u64,
    buf_len: usize,
    pos: u64,
}

impl<'a> SourceStream<'a> {
    pub fn new(source: &'a dyn SnapshotSource, buffer_size: usize) -> Self {
        Self {
            source,
            buf: vec![0; buffer_size.max(1)],
            buf_start: 0,
            buf_len: 0,
            pos: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    #[inline]
    fn buffered(&self, pos: u64) -> bool {
        pos >= self.buf_start && pos < self.buf_start + self.buf_len as u64
    }

    fn fill(&mut self, pos: u64) -> io::Result<()> {
        let remaining = self.source.len().saturating_sub(pos);
        let len = (self.buf.len() as u64).min(remaining) as usize;
        self.source.read_exact_at(pos, &mut self.buf[..len])?;
        self.buf_start = pos;
        self.buf_len = len;
        Ok(())
    }
}

impl Read for SourceStream<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let total = self.source.len();
        if out.is_empty() || self.pos >= total {
            return Ok(0);
        }

        if !self.buffered(self.pos) {
            // Reads larger than the buffer bypass it
            if out.len() >= self.buf.len() {
                let n = (out.len() as u64).min(total - self.pos) as usize;
                self.source.read_exact_at(self.pos, &mut out[..n])?;
                self.pos += n as u64;
                return Ok(n);
            }
            self.fill(self.pos)?;
        }

        let start = (self.pos - self.buf_start) as usize;
        let available = &self.buf[start..self.buf_len];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for SourceStream<'_> {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let new_pos = match target {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => self.source.len().checked_add_signed(delta),
        };
        match new_pos {
            Some(pos) => {
                self.pos = pos;
                Ok(pos)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HprofReader
// ═══════════════════════════════════════════════════════════════════════════

/// Big-endian hprof decoder over a `Read + Seek`
///
/// `position` is the absolute dump offset of the next byte; `limit` is the
/// absolute offset reads must not cross.
pub struct HprofReader<R> {
    inner: R,
    position: u64,
    limit: u64,
    id_size: IdentifierSize,
}

fn map_io(at: u64, err: io::Error) -> LeakgraphError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        LeakgraphError::parse(at, "unexpected end of data")
    } else {
        LeakgraphError::Io(err)
    }
}

impl<R: Read + Seek> HprofReader<R> {
    /// `inner` must be positioned at absolute offset `position`
    pub fn new(inner: R, id_size: IdentifierSize, position: u64, limit: u64) -> Self {
        Self {
            inner,
            position,
            limit,
            id_size,
        }
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[inline]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Bytes left before `limit`
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.position)
    }

    /// Narrow (or restore) the read boundary; returns the previous one
    pub fn set_limit(&mut self, limit: u64) -> u64 {
        std::mem::replace(&mut self.limit, limit)
    }

    #[inline]
    pub fn id_size(&self) -> IdentifierSize {
        self.id_size
    }

    /// Switch identifier width once the header has been read
    pub fn set_id_size(&mut self, id_size: IdentifierSize) {
        self.id_size = id_size;
    }

    #[inline]
    fn ensure(&self, n: u64) -> Result<()> {
        if n > self.remaining() {
            return Err(LeakgraphError::parse(
                self.position,
                format!("need {} bytes, only {} left", n, self.remaining()),
            ));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let at = self.position;
        let v = self.inner.read_u8().map_err(|e| map_io(at, e))?;
        self.position += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let at = self.position;
        let v = self.inner.read_u16::<BigEndian>().map_err(|e| map_io(at, e))?;
        self.position += 2;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let at = self.position;
        let v = self.inner.read_u32::<BigEndian>().map_err(|e| map_io(at, e))?;
        self.position += 4;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        let at = self.position;
        let v = self.inner.read_u64::<BigEndian>().map_err(|e| map_io(at, e))?;
        self.position += 8;
        Ok(v)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// Object identifier, sign-extended to 64 bits then treated as opaque
    pub fn read_id(&mut self) -> Result<u64> {
        Ok(match self.id_size {
            IdentifierSize::U1 => i64::from(self.read_i8()?) as u64,
            IdentifierSize::U2 => i64::from(self.read_i16()?) as u64,
            IdentifierSize::U4 => i64::from(self.read_i32()?) as u64,
            IdentifierSize::U8 => self.read_u64()?,
        })
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.ensure(n as u64)?;
        let at = self.position;
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf).map_err(|e| map_io(at, e))?;
        self.position += n as u64;
        Ok(buf)
    }

    /// Advance without copying
    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.ensure(n)?;
        let delta = i64::try_from(n)
            .map_err(|_| LeakgraphError::parse(self.position, "skip length overflows"))?;
        self.inner.seek(SeekFrom::Current(delta))?;
        self.position += n;
        Ok(())
    }

    /// `n` bytes decoded as (lossy) UTF-8
    pub fn read_utf8(&mut self, n: usize) -> Result<String> {
        let bytes = self.read_bytes(n)?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    /// Basic type tag, rejecting tags that name no field type
    pub fn read_field_type(&mut self) -> Result<FieldType> {
        let at = self.position;
        let tag = self.read_u8()?;
        FieldType::from_tag(tag)
            .ok_or_else(|| LeakgraphError::parse(at, format!("invalid basic type tag {}", tag)))
    }

    pub fn read_primitive_type(&mut self) -> Result<PrimitiveType> {
        let at = self.position;
        let tag = self.read_u8()?;
        PrimitiveType::from_tag(tag)
            .ok_or_else(|| LeakgraphError::parse(at, format!("invalid primitive type tag {}", tag)))
    }

    pub fn read_value(&mut self, field_type: FieldType) -> Result<HeapValue> {
        Ok(match field_type {
            FieldType::Object => HeapValue::Object(self.read_id()?),
            FieldType::Primitive(p) => match p {
                PrimitiveType::Boolean => HeapValue::Boolean(self.read_u8()? != 0),
                PrimitiveType::Char => HeapValue::Char(self.read_u16()?),
                PrimitiveType::Float => HeapValue::Float(f32::from_bits(self.read_u32()?)),
                PrimitiveType::Double => HeapValue::Double(f64::from_bits(self.read_u64()?)),
                PrimitiveType::Byte => HeapValue::Byte(self.read_i8()?),
                PrimitiveType::Short => HeapValue::Short(self.read_i16()?),
                PrimitiveType::Int => HeapValue::Int(self.read_i32()?),
                PrimitiveType::Long => HeapValue::Long(self.read_i64()?),
            },
        })
    }
}
