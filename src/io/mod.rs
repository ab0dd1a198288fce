//! File-backed byte streams.
//!
//! `MappedFile` memory-maps a core file read-only and exposes it through
//! `Read + Seek`, the same seam every derived view implements, so a real
//! file, a virtual-address view, and a bounded window all compose
//! interchangeably.

pub mod bound;

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A read-only memory-mapped file with a seekable cursor.
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    // None when the file size is zero; memmap cannot map empty files.
    mmap: Option<Mmap>,
    pos: u64,
}

impl MappedFile {
    /// Open and map a file read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        debug!(path = %path.display(), size = len, "mapping file");

        let mmap = if len == 0 {
            None
        } else {
            // Safety: the file is a real on-disk file and the map is read-only.
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            pos: 0,
        })
    }

    /// Total size of the underlying file in bytes.
    pub fn len(&self) -> u64 {
        self.mmap.as_ref().map_or(0, |m| m.len() as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for MappedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(map) = &self.mmap else { return Ok(0) };
        let len = map.len() as u64;
        if self.pos >= len {
            return Ok(0);
        }
        let start = self.pos as usize;
        let n = buf.len().min((len - self.pos) as usize);
        buf[..n].copy_from_slice(&map[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for MappedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => p as i128,
            SeekFrom::Current(d) => self.pos as i128 + d as i128,
            SeekFrom::End(d) => self.len() as i128 + d as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of file",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_file(content: &[u8]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content).unwrap();
        temp_file
    }

    #[test]
    fn open_file_successfully() {
        let file = create_temp_file(b"hello world");
        let mapped = MappedFile::open(file.path()).unwrap();
        assert_eq!(mapped.len(), 11);
        assert!(!mapped.is_empty());
    }

    #[test]
    fn read_and_seek() {
        let file = create_temp_file(b"hello world");
        let mut mapped = MappedFile::open(file.path()).unwrap();

        let mut buf = [0u8; 5];
        mapped.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        mapped.seek(SeekFrom::Start(6)).unwrap();
        mapped.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"world");

        mapped.seek(SeekFrom::Current(-5)).unwrap();
        assert_eq!(mapped.stream_position().unwrap(), 6);

        assert_eq!(mapped.seek(SeekFrom::End(-1)).unwrap(), 10);
    }

    #[test]
    fn read_past_eof_returns_partial() {
        let file = create_temp_file(b"hello");
        let mut mapped = MappedFile::open(file.path()).unwrap();
        mapped.seek(SeekFrom::Start(3)).unwrap();
        let mut buf = [0u8; 10];
        let n = mapped.read(&mut buf).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&buf[..2], b"lo");
        assert_eq!(mapped.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn seek_before_start_fails() {
        let file = create_temp_file(b"hello");
        let mut mapped = MappedFile::open(file.path()).unwrap();
        assert!(mapped.seek(SeekFrom::Current(-1)).is_err());
    }

    #[test]
    fn open_empty_file() {
        let file = create_temp_file(b"");
        let mut mapped = MappedFile::open(file.path()).unwrap();
        assert_eq!(mapped.len(), 0);
        assert!(mapped.is_empty());
        let mut buf = [0u8; 4];
        assert_eq!(mapped.read(&mut buf).unwrap(), 0);
    }
}
