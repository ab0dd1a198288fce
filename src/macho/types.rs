//! Mach-O constants and core data types.
//!
//! Core dumps are captured on the machine that produced them, so all
//! multi-byte fields are read little-endian with no byte-swapping.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-bit Mach-O magic.
pub const MH_MAGIC: u32 = 0xfeedface;
/// 64-bit Mach-O magic.
pub const MH_MAGIC_64: u32 = 0xfeedfacf;

/// `filetype` value declaring a core dump.
pub const MH_CORE: u32 = 0x4;

/// Region-defining load command, 32-bit layout.
pub const LC_SEGMENT: u32 = 0x1;
/// Symbol-table descriptor load command.
pub const LC_SYMTAB: u32 = 0x2;
/// Region-defining load command, 64-bit layout.
pub const LC_SEGMENT_64: u32 = 0x19;

/// `n_type` mask: any of these bits marks a debugger (stab) entry.
pub const N_STAB: u8 = 0xe0;
/// `n_type` mask for the type classification bits.
pub const N_TYPE: u8 = 0x0e;
/// `n_type` value (under `N_TYPE`) for a section-relative symbol.
pub const N_SECT: u8 = 0x0e;
/// `n_type` bit marking an externally-visible symbol.
pub const N_EXT: u8 = 0x01;

/// Image layout selected by the magic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    Macho32,
    Macho64,
}

impl Format {
    /// Classify a little-endian magic value, `None` if unrecognized.
    pub fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            MH_MAGIC => Some(Format::Macho32),
            MH_MAGIC_64 => Some(Format::Macho64),
            _ => None,
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            Format::Macho32 => 32,
            Format::Macho64 => 64,
        }
    }

    /// Size of the fixed header for this layout (the 64-bit header
    /// carries a trailing `reserved` word).
    pub(crate) fn header_size(&self) -> usize {
        match self {
            Format::Macho32 => 28,
            Format::Macho64 => 32,
        }
    }
}

bitflags! {
    /// Segment protection bits as declared by the dump.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct VmProt: u32 {
        const READ = 0x1;
        const WRITE = 0x2;
        const EXECUTE = 0x4;
    }
}

impl VmProt {
    /// Readable and executable, nothing else: the protection compiled
    /// code is mapped with, and the scan's candidate predicate.
    pub fn is_code(&self) -> bool {
        *self == (VmProt::READ | VmProt::EXECUTE)
    }
}

impl fmt::Display for VmProt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut perms = String::new();
        perms.push(if self.contains(VmProt::READ) { 'r' } else { '-' });
        perms.push(if self.contains(VmProt::WRITE) { 'w' } else { '-' });
        perms.push(if self.contains(VmProt::EXECUTE) { 'x' } else { '-' });
        write!(f, "{}", perms)
    }
}

/// One region mapping a file byte-range onto a virtual-address
/// byte-range.
///
/// `file_size` may be smaller than `vm_size`: trailing pages of the
/// virtual range are then mapped but not backed by file content.
/// Segments are assumed not to overlap in virtual-address space; the
/// parser does not validate this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub file_offset: u64,
    pub file_size: u64,
    pub vm_address: u64,
    pub vm_size: u64,
    pub prot: VmProt,
}

impl Segment {
    /// Whether `addr` falls inside the segment's virtual range.
    pub fn contains_vm(&self, addr: u64) -> bool {
        addr >= self.vm_address && addr - self.vm_address < self.vm_size
    }

    /// Whether `offset` falls inside the segment's file-backed range.
    pub fn contains_file(&self, offset: u64) -> bool {
        offset >= self.file_offset && offset - self.file_offset < self.file_size
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:#x}..{:#x} {}",
            if self.name.is_empty() { "?" } else { &self.name },
            self.vm_address,
            self.vm_address.saturating_add(self.vm_size),
            self.prot
        )
    }
}

/// Fixed Mach-O header, width-normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachHeader {
    pub format: Format,
    pub cputype: i32,
    pub cpusubtype: i32,
    pub filetype: u32,
    pub ncmds: u32,
    pub sizeofcmds: u32,
    pub flags: u32,
}

/// `LC_SYMTAB` payload: where the symbol and string tables live in the
/// file the image was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymtabCommand {
    pub symoff: u32,
    pub nsyms: u32,
    pub stroff: u32,
    pub strsize: u32,
}

/// One symbol-table entry, width-normalized.
#[derive(Debug, Clone, Copy)]
pub struct Nlist {
    pub strx: u32,
    pub n_type: u8,
    pub sect: u8,
    pub desc: u16,
    pub value: u64,
}

impl Nlist {
    /// Entry size for the 32-bit layout.
    pub const SIZE32: usize = 12;
    /// Entry size for the 64-bit layout.
    pub const SIZE64: usize = 16;

    pub(crate) fn entry_size(format: Format) -> usize {
        match format {
            Format::Macho32 => Self::SIZE32,
            Format::Macho64 => Self::SIZE64,
        }
    }

    /// Decode one entry from `raw`, which must hold at least
    /// `entry_size(format)` bytes.
    pub(crate) fn parse(raw: &[u8], format: Format) -> Self {
        let value = match format {
            Format::Macho32 => u32_at(raw, 8).unwrap_or(0) as u64,
            Format::Macho64 => u64_at(raw, 8).unwrap_or(0),
        };
        Self {
            strx: u32_at(raw, 0).unwrap_or(0),
            n_type: raw[4],
            sect: raw[5],
            desc: u16_at(raw, 6).unwrap_or(0),
            value,
        }
    }

    pub fn is_external(&self) -> bool {
        self.n_type & N_EXT != 0
    }

    pub fn is_section_defined(&self) -> bool {
        self.n_type & N_TYPE == N_SECT
    }

    pub fn is_stab(&self) -> bool {
        self.n_type & N_STAB != 0
    }
}

pub(crate) fn u16_at(data: &[u8], off: usize) -> Option<u16> {
    let b = data.get(off..off + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn u32_at(data: &[u8], off: usize) -> Option<u32> {
    let b = data.get(off..off + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn u64_at(data: &[u8], off: usize) -> Option<u64> {
    let b = data.get(off..off + 8)?;
    Some(u64::from_le_bytes([
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
    ]))
}

/// The prefix of `data` up to (not including) the first NUL byte.
pub(crate) fn nul_terminated(data: &[u8]) -> &[u8] {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    &data[..end]
}
