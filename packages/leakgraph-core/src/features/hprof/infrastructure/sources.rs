//! [`SnapshotSource`] implementations
//!
//! - [`FileSnapshotSource`]: positioned reads on an open file, no shared cursor
//! - [`MmapSnapshotSource`]: memory-mapped file, reads are slice copies
//! - [`InMemorySnapshotSource`]: owned bytes, used for synthetic dumps

use crate::features::hprof::ports::{ReadCounters, SnapshotSource, SourceStats};
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════
// File
// ═══════════════════════════════════════════════════════════════════════════

/// Heap dump file read with `pread`-style positioned reads
#[derive(Debug)]
pub struct FileSnapshotSource {
    file: File,
    path: PathBuf,
    len: u64,
    counters: ReadCounters,
}

impl FileSnapshotSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            path,
            len,
            counters: ReadCounters::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        check_bounds(offset, buf.len(), self.len)?;
        positioned_read(&self.file, offset, buf)?;
        self.counters.record(offset, buf.len());
        Ok(())
    }

    fn stats(&self) -> SourceStats {
        self.counters.snapshot()
    }

    fn description(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(unix)]
fn positioned_read(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn positioned_read(file: &File, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Memory map
// ═══════════════════════════════════════════════════════════════════════════

/// Memory-mapped heap dump
pub struct MmapSnapshotSource {
    mmap: Mmap,
    path: PathBuf,
    counters: ReadCounters,
}

impl MmapSnapshotSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        // SAFETY: the dump is treated as immutable for the lifetime of the map;
        // a concurrent writer truncating it is outside what we support.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path,
            counters: ReadCounters::new(),
        })
    }
}

impl std::fmt::Debug for MmapSnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapSnapshotSource")
            .field("path", &self.path)
            .field("len", &self.mmap.len())
            .finish()
    }
}

impl SnapshotSource for MmapSnapshotSource {
    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        copy_from_slice(&self.mmap, offset, buf)?;
        self.counters.record(offset, buf.len());
        Ok(())
    }

    fn stats(&self) -> SourceStats {
        self.counters.snapshot()
    }

    fn description(&self) -> String {
        format!("{} (mmap)", self.path.display())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// In memory
// ═══════════════════════════════════════════════════════════════════════════

/// Heap dump held in memory; clones share the bytes but not the counters
#[derive(Debug)]
pub struct InMemorySnapshotSource {
    bytes: Arc<[u8]>,
    counters: ReadCounters,
}

impl InMemorySnapshotSource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            counters: ReadCounters::new(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Clone for InMemorySnapshotSource {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.bytes))
    }
}

impl SnapshotSource for InMemorySnapshotSource {
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        copy_from_slice(&self.bytes, offset, buf)?;
        self.counters.record(offset, buf.len());
        Ok(())
    }

    fn stats(&self) -> SourceStats {
        self.counters.snapshot()
    }

    fn description(&self) -> String {
        format!("in-memory ({} bytes)", self.bytes.len())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn check_bounds(offset: u64, len: usize, total: u64) -> io::Result<()> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= total => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("read of {} bytes at {} past end {}", len, offset, total),
        )),
    }
}

fn copy_from_slice(bytes: &[u8], offset: u64, buf: &mut [u8]) -> io::Result<()> {
    check_bounds(offset, buf.len(), bytes.len() as u64)?;
    let start = offset as usize;
    buf.copy_from_slice(&bytes[start..start + buf.len()]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_in_memory_reads_and_counts() {
        let source = InMemorySnapshotSource::new(vec![1u8, 2, 3, 4, 5]);
        let mut buf = [0u8; 2];
        source.read_exact_at(3, &mut buf).unwrap();
        assert_eq!(buf, [4, 5]);
        assert_eq!(source.stats().bytes_read, 2);
        assert_eq!(source.stats().seek_distance, 3);
    }

    #[test]
    fn test_read_past_end_is_unexpected_eof() {
        let source = InMemorySnapshotSource::new(vec![0u8; 4]);
        let mut buf = [0u8; 2];
        let err = source.read_exact_at(3, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(source.stats().reads, 0);
    }

    #[test]
    fn test_file_and_mmap_sources_agree() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"JAVA PROFILE").unwrap();
        file.flush().unwrap();

        let by_file = FileSnapshotSource::open(file.path()).unwrap();
        let by_mmap = MmapSnapshotSource::open(file.path()).unwrap();
        assert_eq!(by_file.len(), 12);
        assert_eq!(by_mmap.len(), 12);

        let mut a = [0u8; 7];
        let mut b = [0u8; 7];
        by_file.read_exact_at(5, &mut a).unwrap();
        by_mmap.read_exact_at(5, &mut b).unwrap();
        assert_eq!(&a, b"PROFILE");
        assert_eq!(a, b);
        assert!(by_mmap.description().ends_with("(mmap)"));
    }
}
