//! Image header parsing and the load-command walk.
//!
//! An image is a fixed header followed by `ncmds` load commands. The
//! walk is linear with no backtracking: region-defining commands
//! populate the segment table, symbol-table descriptors are collected
//! for later resolution, everything else is read to advance the stream
//! and discarded.

use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace};

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::macho::record::LoadCommand;
use crate::macho::types::{
    nul_terminated, u32_at, u64_at, Format, MachHeader, Segment, SymtabCommand, VmProt,
    LC_SEGMENT, LC_SEGMENT_64, LC_SYMTAB,
};

/// Payload size of a region record, past the 8-byte command prefix.
const SEGMENT_PAYLOAD_32: usize = 48;
const SEGMENT_PAYLOAD_64: usize = 64;
/// Payload size of a symbol-table descriptor.
const SYMTAB_PAYLOAD: usize = 16;

/// A parsed image: the fixed header, the segment table in discovery
/// order, and any symbol-table descriptors found during the walk.
#[derive(Debug, Clone)]
pub struct Image {
    pub header: MachHeader,
    pub segments: Vec<Segment>,
    pub symtabs: Vec<SymtabCommand>,
}

/// Read the 4-byte magic without consuming the stream position.
pub(crate) fn peek_magic<S: Read + Seek>(stream: &mut S) -> Result<u32> {
    let at = stream.stream_position()?;
    let mut raw = [0u8; 4];
    stream
        .read_exact(&mut raw)
        .map_err(|e| Error::from_read(e, at, 4))?;
    stream.seek(SeekFrom::Current(-4))?;
    Ok(u32::from_le_bytes(raw))
}

impl Image {
    /// Parse an image at the stream's current position with default
    /// limits.
    pub fn parse<S: Read + Seek>(stream: &mut S) -> Result<Self> {
        Self::parse_with_limits(stream, &Limits::default())
    }

    /// Parse an image at the stream's current position.
    ///
    /// Fails atomically: on any error the caller receives no partially
    /// built table.
    pub fn parse_with_limits<S: Read + Seek>(stream: &mut S, limits: &Limits) -> Result<Self> {
        let magic = peek_magic(stream)?;
        let format = Format::from_magic(magic)
            .ok_or_else(|| Error::InvalidFormat(format!("unrecognized magic {magic:#010x}")))?;
        let header = read_header(stream, format)?;
        trace!(format = ?format, ncmds = header.ncmds, "walking load commands");

        // Not every command defines a region, so the table grows as
        // matches are found instead of being pre-sized to `ncmds`.
        let mut segments = Vec::new();
        let mut symtabs = Vec::new();
        for _ in 0..header.ncmds {
            let at = stream.stream_position()?;
            let lc = LoadCommand::read(stream, limits)?;
            match lc.cmd {
                LC_SEGMENT => segments.push(parse_segment(&lc, Format::Macho32, at)?),
                LC_SEGMENT_64 => segments.push(parse_segment(&lc, Format::Macho64, at)?),
                LC_SYMTAB => symtabs.push(parse_symtab(&lc, at)?),
                other => trace!(cmd = other, size = lc.cmdsize, "skipping load command"),
            }
        }

        debug!(
            format = ?format,
            segments = segments.len(),
            symtabs = symtabs.len(),
            "image parsed"
        );
        Ok(Self {
            header,
            segments,
            symtabs,
        })
    }
}

fn read_header<S: Read + Seek>(stream: &mut S, format: Format) -> Result<MachHeader> {
    let at = stream.stream_position()?;
    let size = format.header_size();
    let mut raw = [0u8; 32];
    stream
        .read_exact(&mut raw[..size])
        .map_err(|e| Error::from_read(e, at, size as u64))?;

    Ok(MachHeader {
        format,
        cputype: u32_at(&raw, 4).unwrap_or(0) as i32,
        cpusubtype: u32_at(&raw, 8).unwrap_or(0) as i32,
        filetype: u32_at(&raw, 12).unwrap_or(0),
        ncmds: u32_at(&raw, 16).unwrap_or(0),
        sizeofcmds: u32_at(&raw, 20).unwrap_or(0),
        flags: u32_at(&raw, 24).unwrap_or(0),
        // 64-bit layout carries a trailing reserved word, ignored.
    })
}

fn parse_segment(lc: &LoadCommand, width: Format, at: u64) -> Result<Segment> {
    let need = match width {
        Format::Macho32 => SEGMENT_PAYLOAD_32,
        Format::Macho64 => SEGMENT_PAYLOAD_64,
    };
    let p = &lc.payload[..];
    if p.len() < need {
        return Err(Error::Truncated {
            offset: at,
            needed: (need - p.len()) as u64,
        });
    }

    let name = String::from_utf8_lossy(nul_terminated(&p[..16])).into_owned();
    let (vm_address, vm_size, file_offset, file_size, initprot) = match width {
        Format::Macho32 => (
            u32_at(p, 16).unwrap_or(0) as u64,
            u32_at(p, 20).unwrap_or(0) as u64,
            u32_at(p, 24).unwrap_or(0) as u64,
            u32_at(p, 28).unwrap_or(0) as u64,
            u32_at(p, 36).unwrap_or(0),
        ),
        Format::Macho64 => (
            u64_at(p, 16).unwrap_or(0),
            u64_at(p, 24).unwrap_or(0),
            u64_at(p, 32).unwrap_or(0),
            u64_at(p, 40).unwrap_or(0),
            u32_at(p, 52).unwrap_or(0),
        ),
    };

    Ok(Segment {
        name,
        file_offset,
        file_size,
        vm_address,
        vm_size,
        prot: VmProt::from_bits_retain(initprot),
    })
}

fn parse_symtab(lc: &LoadCommand, at: u64) -> Result<SymtabCommand> {
    let p = &lc.payload[..];
    if p.len() < SYMTAB_PAYLOAD {
        return Err(Error::Truncated {
            offset: at,
            needed: (SYMTAB_PAYLOAD - p.len()) as u64,
        });
    }
    Ok(SymtabCommand {
        symoff: u32_at(p, 0).unwrap_or(0),
        nsyms: u32_at(p, 4).unwrap_or(0),
        stroff: u32_at(p, 8).unwrap_or(0),
        strsize: u32_at(p, 12).unwrap_or(0),
    })
}
