//! Core dump address spaces.
//!
//! An [`AddressSpace`] owns the backing stream of one core dump plus
//! the segment table parsed from it. A [`VmView`] reads bytes "as the
//! dumped process would have seen them": every access is resolved
//! through the segment table to the underlying file bytes, so reads
//! work across physically discontiguous file regions.

use std::io::{self, Read, Seek, SeekFrom};
use tracing::debug;

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::macho::image::Image;
use crate::macho::types::{Format, Segment, MH_CORE};

/// A parsed core dump: format tag, segment table in discovery order,
/// and exclusive ownership of the backing stream.
///
/// All derived views borrow from the `AddressSpace`, so none can
/// outlive it.
#[derive(Debug)]
pub struct AddressSpace<S> {
    stream: S,
    format: Format,
    segments: Vec<Segment>,
}

impl<S: Read + Seek> AddressSpace<S> {
    /// Parse `stream` as a core dump and take ownership of it.
    pub fn open(stream: S) -> Result<Self> {
        Self::open_with_limits(stream, &Limits::default())
    }

    /// Parse `stream` as a core dump under explicit limits.
    pub fn open_with_limits(mut stream: S, limits: &Limits) -> Result<Self> {
        stream.seek(SeekFrom::Start(0))?;
        let image = Image::parse_with_limits(&mut stream, limits)?;

        // A 64-bit image must declare itself a core. The 32-bit loader
        // never carried this check, and 32-bit cores in the wild omit
        // the filetype, so only the 64-bit path enforces it.
        if image.header.format == Format::Macho64 && image.header.filetype != MH_CORE {
            return Err(Error::InvalidFormat(format!(
                "image declares filetype {:#x}, expected a core dump",
                image.header.filetype
            )));
        }

        debug!(
            format = ?image.header.format,
            segments = image.segments.len(),
            "core dump opened"
        );
        Ok(Self {
            stream,
            format: image.header.format,
            segments: image.segments,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The segment table, in discovery order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Translate a file offset back to the virtual address it is mapped
    /// at: the first segment whose file range contains the offset wins.
    pub fn file_to_vm(&self, offset: u64) -> Option<u64> {
        self.segments
            .iter()
            .find(|s| s.contains_file(offset))
            .map(|s| s.vm_address + (offset - s.file_offset))
    }

    /// A virtual-address view with its own cursor, starting at address 0.
    pub fn vm(&mut self) -> VmView<'_, S> {
        VmView {
            segments: &self.segments,
            stream: &mut self.stream,
            pos: 0,
        }
    }

    /// Release the address space, returning the backing stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// A seekable, readable stream addressed by virtual address.
///
/// The cursor is independent of the backing stream's file-offset
/// cursor. Seeks are never bounds-checked; a cursor outside every
/// segment is legal and simply yields short or empty reads. A virtual
/// page that is mapped but not backed by file content also reads short
/// rather than faulting: the view never invents bytes the dump does
/// not contain.
pub struct VmView<'a, S> {
    segments: &'a [Segment],
    stream: &'a mut S,
    pos: u64,
}

impl<S: Read + Seek> VmView<'_, S> {
    /// Current virtual-address cursor.
    pub fn address(&self) -> u64 {
        self.pos
    }

    /// Position the cursor at `addr` and read, returning the number of
    /// bytes copied (possibly short).
    pub fn read_at(&mut self, addr: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.pos = addr;
        self.read(buf)
    }
}

impl<S: Read + Seek> Read for VmView<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut copied = 0;
        while copied < buf.len() {
            // First segment whose virtual range holds the cursor wins.
            let Some(seg) = self.segments.iter().find(|s| s.contains_vm(self.pos)) else {
                break; // unmapped address: clean short read
            };
            let within = self.pos - seg.vm_address;
            if within >= seg.file_size {
                // Mapped but not file-backed (zero-fill tail): nothing
                // to copy here, the read ends short.
                break;
            }
            let Some(file_pos) = seg.file_offset.checked_add(within) else {
                break;
            };
            let avail = seg.file_size - within;
            let want = ((buf.len() - copied) as u64).min(avail) as usize;
            self.stream.seek(SeekFrom::Start(file_pos))?;
            let n = self.stream.read(&mut buf[copied..copied + want])?;
            if n == 0 {
                break;
            }
            copied += n;
            self.pos += n as u64;
        }
        Ok(copied)
    }
}

impl<S> Seek for VmView<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(addr) => self.pos = addr,
            SeekFrom::Current(delta) => {
                let target = self.pos as i128 + delta as i128;
                if target < 0 || target > u64::MAX as i128 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "virtual cursor out of range",
                    ));
                }
                self.pos = target as u64;
            }
            // A virtual address space has no meaningful end.
            SeekFrom::End(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "seek from end is not defined for an address space",
                ));
            }
        }
        Ok(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macho::testutil::{header32, header64, segment32, segment64, unknown_command};
    use crate::macho::types::MH_CORE;
    use std::io::Cursor;

    /// A 32-bit core with two mapped segments:
    ///   vm 0x1000..0x1010 -> file 0x100..0x110 ("AAAA... 16 bytes")
    ///   vm 0x2000..0x2020 -> file 0x110..0x120 (16 file-backed bytes,
    ///                        16 more mapped but unbacked)
    fn two_segment_core() -> Vec<u8> {
        let cmds: Vec<u8> = [
            segment32("seg_a", 0x1000, 0x10, 0x100, 0x10, 0x3),
            unknown_command(),
            segment32("seg_b", 0x2000, 0x20, 0x110, 0x10, 0x3),
        ]
        .concat();
        let mut bytes = header32(MH_CORE, 3, cmds.len() as u32);
        bytes.extend(cmds);
        bytes.resize(0x100, 0);
        bytes.extend((0u8..16).map(|i| 0x40 + i)); // file 0x100..0x110
        bytes.extend((0u8..16).map(|i| 0x60 + i)); // file 0x110..0x120
        bytes
    }

    fn open_core() -> AddressSpace<Cursor<Vec<u8>>> {
        AddressSpace::open(Cursor::new(two_segment_core())).unwrap()
    }

    #[test]
    fn open_collects_segments_in_discovery_order() {
        let space = open_core();
        assert_eq!(space.format(), Format::Macho32);
        let names: Vec<&str> = space.segments().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["seg_a", "seg_b"]);
    }

    #[test]
    fn vm_read_matches_backing_bytes() {
        let mut space = open_core();
        let mut vm = space.vm();
        let mut buf = [0u8; 8];

        // Bytes at vm 0x1004 are the backing bytes at file 0x104.
        let n = vm.read_at(0x1004, &mut buf).unwrap();
        assert_eq!(n, 8);
        assert_eq!(buf, [0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x4b]);
    }

    #[test]
    fn vm_seek_then_read_equals_direct_translation() {
        let mut space = open_core();
        let mut vm = space.vm();
        vm.seek(SeekFrom::Start(0x2002)).unwrap();
        let mut buf = [0u8; 4];
        vm.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0x62, 0x63, 0x64, 0x65]); // file 0x112..0x116
        assert_eq!(vm.address(), 0x2006);
    }

    #[test]
    fn vm_read_stops_at_unmapped_gap() {
        let mut space = open_core();
        let mut vm = space.vm();
        let mut buf = [0u8; 32];

        // seg_a is 16 bytes; the range 0x1010..0x2000 is unmapped, so
        // the read ends cleanly at the segment boundary.
        let n = vm.read_at(0x1008, &mut buf).unwrap();
        assert_eq!(n, 8);
    }

    #[test]
    fn vm_read_spans_adjacent_segments() {
        // Two segments contiguous in vm space read as one range.
        let cmds: Vec<u8> = [
            segment32("lo", 0x1000, 0x10, 0x100, 0x10, 0x3),
            segment32("hi", 0x1010, 0x10, 0x110, 0x10, 0x3),
        ]
        .concat();
        let mut bytes = header32(MH_CORE, 2, cmds.len() as u32);
        bytes.extend(cmds);
        bytes.resize(0x100, 0);
        bytes.extend(0u8..32);

        let mut space = AddressSpace::open(Cursor::new(bytes)).unwrap();
        let mut vm = space.vm();
        let mut buf = [0u8; 24];
        let n = vm.read_at(0x1008, &mut buf).unwrap();
        assert_eq!(n, 24);
        let expect: Vec<u8> = (8u8..32).collect();
        assert_eq!(&buf[..], &expect[..]);
    }

    #[test]
    fn unmapped_address_reads_zero_bytes_not_error() {
        let mut space = open_core();
        let mut vm = space.vm();
        let mut buf = [0u8; 8];
        assert_eq!(vm.read_at(0xdead_0000, &mut buf).unwrap(), 0);
    }

    #[test]
    fn mapped_but_unbacked_page_reads_short() {
        let mut space = open_core();
        let mut vm = space.vm();
        let mut buf = [0u8; 32];

        // seg_b maps 0x20 bytes but backs only 0x10 with file content;
        // the read stops at the backed prefix instead of faulting.
        let n = vm.read_at(0x2000, &mut buf).unwrap();
        assert_eq!(n, 16);

        // Starting inside the unbacked tail reads nothing at all.
        assert_eq!(vm.read_at(0x2018, &mut buf).unwrap(), 0);
    }

    #[test]
    fn vm_seek_semantics() {
        let mut space = open_core();
        let mut vm = space.vm();

        assert_eq!(vm.seek(SeekFrom::Start(0x5000)).unwrap(), 0x5000);
        assert_eq!(vm.seek(SeekFrom::Current(-0x1000)).unwrap(), 0x4000);
        // Out-of-range cursors are legal; they just read empty.
        let mut buf = [0u8; 4];
        assert_eq!(vm.read(&mut buf).unwrap(), 0);

        assert!(vm.seek(SeekFrom::End(0)).is_err());
        assert!(vm.seek(SeekFrom::Current(-0x10000)).is_err());
    }

    #[test]
    fn file_to_vm_reverse_lookup() {
        let space = open_core();
        assert_eq!(space.file_to_vm(0x100), Some(0x1000));
        assert_eq!(space.file_to_vm(0x10f), Some(0x100f));
        assert_eq!(space.file_to_vm(0x110), Some(0x2000));
        assert_eq!(space.file_to_vm(0x11f), Some(0x200f));
        // Header bytes and offsets past every segment translate to nothing.
        assert_eq!(space.file_to_vm(0x0), None);
        assert_eq!(space.file_to_vm(0x1000), None);
    }

    #[test]
    fn translation_is_order_preserving_within_a_segment() {
        let space = open_core();
        let a = space.file_to_vm(0x104).unwrap();
        let b = space.file_to_vm(0x108).unwrap();
        assert!(a < b);
        assert_eq!(b - a, 4);
    }

    #[test]
    fn bad_magic_fails_with_format_error() {
        let mut bytes = two_segment_core();
        bytes[0..4].copy_from_slice(&0xdeadbeefu32.to_le_bytes());
        let err = AddressSpace::open(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn core_open_64bit_requires_core_filetype() {
        let cmds = segment64("seg", 0x1000, 0x10, 0x100, 0x10, 0x3);
        let sizeofcmds = cmds.len() as u32;

        let mut good = header64(MH_CORE, 1, sizeofcmds);
        good.extend(cmds.clone());
        good.resize(0x110, 0);
        assert!(AddressSpace::open(Cursor::new(good)).is_ok());

        let mut bad = header64(0x2 /* executable */, 1, sizeofcmds);
        bad.extend(cmds);
        bad.resize(0x110, 0);
        let err = AddressSpace::open(Cursor::new(bad)).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn core_open_32bit_does_not_check_filetype() {
        // The 32-bit path accepts any declared purpose.
        let cmds = segment32("seg", 0x1000, 0x10, 0x100, 0x10, 0x3);
        let mut bytes = header32(0x2 /* executable */, 1, cmds.len() as u32);
        bytes.extend(cmds);
        bytes.resize(0x110, 0);
        assert!(AddressSpace::open(Cursor::new(bytes)).is_ok());
    }
}
