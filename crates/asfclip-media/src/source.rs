//! Random-access byte sources.

use asfclip_common::Result;
use bytes::Bytes;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Random-access read interface over a container file.
pub trait ByteSource: Send {
    /// Read up to `len` bytes at `offset`. Returns fewer bytes at end of
    /// source, and an empty buffer at or past the end.
    fn read(&mut self, offset: u64, len: usize) -> Result<Bytes>;

    /// Total length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// File-backed byte source.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    path: PathBuf,
    len: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        tracing::debug!(path = %path.display(), len, "Opened byte source");
        Ok(Self { file, path, len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, offset: u64, len: usize) -> Result<Bytes> {
        if offset >= self.len {
            return Ok(Bytes::new());
        }
        let len = (len as u64).min(self.len - offset) as usize;
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(len);
        (&mut self.file).take(len as u64).read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    fn len(&self) -> u64 {
        self.len
    }
}

/// In-memory byte source.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

impl ByteSource for MemorySource {
    fn read(&mut self, offset: u64, len: usize) -> Result<Bytes> {
        let start = offset.min(self.data.len() as u64) as usize;
        let end = start.saturating_add(len).min(self.data.len());
        Ok(self.data.slice(start..end))
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_source_short_read() {
        let mut source = MemorySource::new(vec![1u8, 2, 3, 4, 5]);
        assert_eq!(source.len(), 5);
        assert_eq!(&source.read(1, 2).unwrap()[..], &[2, 3]);
        assert_eq!(&source.read(3, 10).unwrap()[..], &[4, 5]);
        assert!(source.read(9, 4).unwrap().is_empty());
    }

    #[test]
    fn test_file_source_reads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let mut source = FileSource::open(file.path()).unwrap();
        assert_eq!(source.len(), 10);
        assert_eq!(&source.read(4, 3).unwrap()[..], b"456");
        assert_eq!(&source.read(8, 100).unwrap()[..], b"89");
        assert!(source.read(10, 1).unwrap().is_empty());
        assert_eq!(source.path(), file.path());
    }

    #[test]
    fn test_file_source_missing_file() {
        let err = FileSource::open("/nonexistent/clip.wmv").unwrap_err();
        assert!(matches!(err, asfclip_common::Error::Io(_)));
    }
}
