//! Bounded window streams.
//!
//! A window exposes a sub-range of another stream as an independent,
//! zero-based, seekable stream, so a carved-out region can be handed to
//! a parser that expects a complete file. [`BoundedStream`] enforces
//! both ends of `[begin, end)`; [`TailStream`] knows only a starting
//! offset and enforces the lower bound alone. Neither owns the
//! underlying stream, and neither ever exposes a byte outside its
//! declared bound.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// A two-sided window `[begin, end)` over another stream.
///
/// Reads and writes are clamped at `end`; seeks are computed, then
/// clamped into `[begin, end]`. Positions are reported relative to
/// `begin`.
pub struct BoundedStream<'a, S> {
    inner: &'a mut S,
    begin: u64,
    end: u64,
}

impl<'a, S: Seek> BoundedStream<'a, S> {
    /// Open a window over `[begin, end)`, positioned at the window start.
    pub fn new(inner: &'a mut S, begin: u64, end: u64) -> io::Result<Self> {
        let end = end.max(begin);
        inner.seek(SeekFrom::Start(begin))?;
        Ok(Self { inner, begin, end })
    }

    fn clamp(&self, pos: i128) -> u64 {
        pos.clamp(self.begin as i128, self.end as i128) as u64
    }
}

impl<S: Read + Seek> Read for BoundedStream<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.inner.stream_position()?;
        let rem = self.end.saturating_sub(pos);
        let n = (buf.len() as u64).min(rem) as usize;
        self.inner.read(&mut buf[..n])
    }
}

impl<S: Write + Seek> Write for BoundedStream<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let pos = self.inner.stream_position()?;
        let rem = self.end.saturating_sub(pos);
        let n = (buf.len() as u64).min(rem) as usize;
        self.inner.write(&buf[..n])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<S: Seek> Seek for BoundedStream<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => self.begin as i128 + p as i128,
            SeekFrom::Current(d) => self.inner.stream_position()? as i128 + d as i128,
            SeekFrom::End(d) => self.end as i128 + d as i128,
        };
        let clamped = self.clamp(target);
        self.inner.seek(SeekFrom::Start(clamped))?;
        Ok(clamped - self.begin)
    }
}

/// A one-sided window `[begin, ∞)` over another stream.
///
/// Used when only a starting offset is known, e.g. a segment's start
/// with no reliable total size. Reads and writes pass through
/// unchanged; any seek that would resolve below `begin` is forced back
/// to `begin`. Positions are reported relative to `begin`.
pub struct TailStream<'a, S> {
    inner: &'a mut S,
    begin: u64,
}

impl<'a, S: Seek> TailStream<'a, S> {
    /// Open a window over `[begin, ∞)`, positioned at the window start.
    pub fn new(inner: &'a mut S, begin: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(begin))?;
        Ok(Self { inner, begin })
    }
}

impl<S: Read> Read for TailStream<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<S: Write> Write for TailStream<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<S: Seek> Seek for TailStream<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let resolved = match pos {
            SeekFrom::Start(p) => {
                let abs = self.begin.checked_add(p).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset overflow")
                })?;
                self.inner.seek(SeekFrom::Start(abs))?
            }
            SeekFrom::Current(d) => self.inner.seek(SeekFrom::Current(d))?,
            SeekFrom::End(d) => self.inner.seek(SeekFrom::End(d))?,
        };
        let resolved = if resolved < self.begin {
            self.inner.seek(SeekFrom::Start(self.begin))?
        } else {
            resolved
        };
        Ok(resolved - self.begin)
    }
}
