use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Mutex;

/// A synchronized, positioned-read view over an open image file.
///
/// Wraps a file handle, a byte `offset` added to every read (to address a
/// shifted game partition on dual-layer images), and a mutex. Every callback
/// thread shares one `Stream`; the mutex serializes the underlying seek+read
/// pair so concurrent callers never interleave.
pub struct Stream {
    inner: Mutex<StreamInner>,
}

struct StreamInner {
    file: File,
    offset: u64,
}

impl Stream {
    pub fn open(path: &std::path::Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            inner: Mutex::new(StreamInner { file, offset: 0 }),
        })
    }

    /// Sets the partition shift applied to every subsequent read.
    ///
    /// Must only be called during setup, before any concurrent reader
    /// could observe the stream.
    pub fn set_partition_offset(&self, offset: u64) {
        let mut inner = self.inner.lock().expect("stream mutex poisoned");
        inner.offset = offset;
    }

    /// Reads exactly `buf.len()` bytes at `absolute_offset` (before partition
    /// shift). Used for structured parsing where a short read is a format
    /// error, not a valid partial result.
    pub fn read_exact(&self, absolute_offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        let mut inner = self.inner.lock().expect("stream mutex poisoned");
        let seek_to = absolute_offset + inner.offset;
        inner.file.seek(SeekFrom::Start(seek_to))?;
        inner.file.read_exact(buf)
    }

    /// Reads up to `buf.len()` bytes at `absolute_offset` (before partition
    /// shift), returning the number of bytes actually read. Short reads at
    /// EOF are reported as-is, never padded.
    pub fn pread(&self, absolute_offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut inner = self.inner.lock().expect("stream mutex poisoned");
        let seek_to = absolute_offset + inner.offset;
        inner.file.seek(SeekFrom::Start(seek_to))?;

        let mut total = 0;
        while total < buf.len() {
            match inner.file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(total)
    }

    pub fn file_len(&self) -> std::io::Result<u64> {
        let mut inner = self.inner.lock().expect("stream mutex poisoned");
        let pos = inner.file.stream_position()?;
        let len = inner.file.seek(SeekFrom::End(0))?;
        inner.file.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }
}
