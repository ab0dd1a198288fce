//! Synthetic image builders shared by the unit tests.

use crate::macho::types::{LC_SEGMENT, LC_SEGMENT_64, LC_SYMTAB, MH_MAGIC, MH_MAGIC_64};

pub(crate) fn header32(filetype: u32, ncmds: u32, sizeofcmds: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&MH_MAGIC.to_le_bytes());
    out.extend_from_slice(&7i32.to_le_bytes()); // cputype
    out.extend_from_slice(&3i32.to_le_bytes()); // cpusubtype
    out.extend_from_slice(&filetype.to_le_bytes());
    out.extend_from_slice(&ncmds.to_le_bytes());
    out.extend_from_slice(&sizeofcmds.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // flags
    out
}

pub(crate) fn header64(filetype: u32, ncmds: u32, sizeofcmds: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&MH_MAGIC_64.to_le_bytes());
    out.extend_from_slice(&0x0100_0007i32.to_le_bytes()); // cputype
    out.extend_from_slice(&3i32.to_le_bytes()); // cpusubtype
    out.extend_from_slice(&filetype.to_le_bytes());
    out.extend_from_slice(&ncmds.to_le_bytes());
    out.extend_from_slice(&sizeofcmds.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // flags
    out.extend_from_slice(&0u32.to_le_bytes()); // reserved
    out
}

pub(crate) fn segment32(
    name: &str,
    vmaddr: u32,
    vmsize: u32,
    fileoff: u32,
    filesize: u32,
    prot: u32,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&LC_SEGMENT.to_le_bytes());
    out.extend_from_slice(&56u32.to_le_bytes()); // cmdsize
    let mut segname = [0u8; 16];
    segname[..name.len()].copy_from_slice(name.as_bytes());
    out.extend_from_slice(&segname);
    for v in [vmaddr, vmsize, fileoff, filesize] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&prot.to_le_bytes()); // maxprot
    out.extend_from_slice(&prot.to_le_bytes()); // initprot
    out.extend_from_slice(&0u32.to_le_bytes()); // nsects
    out.extend_from_slice(&0u32.to_le_bytes()); // flags
    out
}

pub(crate) fn segment64(
    name: &str,
    vmaddr: u64,
    vmsize: u64,
    fileoff: u64,
    filesize: u64,
    prot: u32,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&LC_SEGMENT_64.to_le_bytes());
    out.extend_from_slice(&72u32.to_le_bytes()); // cmdsize
    let mut segname = [0u8; 16];
    segname[..name.len()].copy_from_slice(name.as_bytes());
    out.extend_from_slice(&segname);
    for v in [vmaddr, vmsize, fileoff, filesize] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&prot.to_le_bytes()); // maxprot
    out.extend_from_slice(&prot.to_le_bytes()); // initprot
    out.extend_from_slice(&0u32.to_le_bytes()); // nsects
    out.extend_from_slice(&0u32.to_le_bytes()); // flags
    out
}

pub(crate) fn symtab_command(symoff: u32, nsyms: u32, stroff: u32, strsize: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&LC_SYMTAB.to_le_bytes());
    out.extend_from_slice(&24u32.to_le_bytes()); // cmdsize
    for v in [symoff, nsyms, stroff, strsize] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

pub(crate) fn unknown_command() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0x26u32.to_le_bytes());
    out.extend_from_slice(&12u32.to_le_bytes());
    out.extend_from_slice(&0xaabbccddu32.to_le_bytes());
    out
}

/// A 32-bit symbol entry as laid out on disk.
pub(crate) fn nlist32(strx: u32, n_type: u8, sect: u8, desc: u16, value: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&strx.to_le_bytes());
    out.push(n_type);
    out.push(sect);
    out.extend_from_slice(&desc.to_le_bytes());
    out.extend_from_slice(&value.to_le_bytes());
    out
}

/// A 64-bit symbol entry as laid out on disk.
pub(crate) fn nlist64(strx: u32, n_type: u8, sect: u8, desc: u16, value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&strx.to_le_bytes());
    out.push(n_type);
    out.push(sect);
    out.extend_from_slice(&desc.to_le_bytes());
    out.extend_from_slice(&value.to_le_bytes());
    out
}
