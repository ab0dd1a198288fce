//! Static symbol recovery.
//!
//! The symbol-table descriptor of an image declares file offsets for
//! its string table and symbol array. For an image that is resident in
//! a core dump's memory those offsets are addresses into the *outer*
//! dump, so they are reverse-translated through the outer segment
//! table and read through the outer virtual view. Only internal
//! (non-exported), section-relative, non-debug entries with a valid
//! name survive filtering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace};

use crate::config::Limits;
use crate::core::AddressSpace;
use crate::error::{Error, Result};
use crate::macho::image::Image;
use crate::macho::types::{nul_terminated, Format, Nlist, SymtabCommand};

/// One named address recovered from an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub vm_address: u64,
    pub name: String,
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} {}", self.vm_address, self.name)
    }
}

/// The internal symbols of one image, sorted ascending by address and
/// immutable after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Extract the symbol table of the image at `image`'s start,
    /// resolving symbol data through `outer`.
    ///
    /// `image` is typically a bounded window carved out of the outer
    /// dump's memory, but any stream positioned at an image works. The
    /// extraction fails atomically: any record read or translation
    /// failure yields an error and no partial table.
    pub fn from_image<S, B>(image: &mut S, outer: &mut AddressSpace<B>) -> Result<Self>
    where
        S: Read + Seek,
        B: Read + Seek,
    {
        Self::from_image_with_limits(image, outer, &Limits::default())
    }

    /// [`SymbolTable::from_image`] under explicit limits.
    pub fn from_image_with_limits<S, B>(
        image: &mut S,
        outer: &mut AddressSpace<B>,
        limits: &Limits,
    ) -> Result<Self>
    where
        S: Read + Seek,
        B: Read + Seek,
    {
        image.seek(SeekFrom::Start(0))?;
        let parsed = Image::parse_with_limits(image, limits)?;
        Self::from_commands(&parsed.symtabs, parsed.header.format, outer, limits)
    }

    /// Build a table from already-collected symbol-table descriptors.
    /// `format` selects the entry width of the image that declared them.
    pub(crate) fn from_commands<B: Read + Seek>(
        commands: &[SymtabCommand],
        format: Format,
        outer: &mut AddressSpace<B>,
        limits: &Limits,
    ) -> Result<Self> {
        let mut symbols = Vec::new();
        for cmd in commands {
            collect_symtab(cmd, format, outer, limits, &mut symbols)?;
        }
        // Ties are broken arbitrarily; stability is not needed.
        symbols.sort_unstable_by_key(|s| s.vm_address);
        debug!(symbols = symbols.len(), "symbol table built");
        Ok(Self { symbols })
    }

    /// The last symbol whose address is at or before `vm_address`:
    /// "which known routine contains this address", assuming a symbol
    /// runs to the start of the next one.
    pub fn find(&self, vm_address: u64) -> Option<&Symbol> {
        let idx = self.symbols.partition_point(|s| s.vm_address <= vm_address);
        if idx == 0 {
            None
        } else {
            Some(&self.symbols[idx - 1])
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl IntoIterator for SymbolTable {
    type Item = Symbol;
    type IntoIter = std::vec::IntoIter<Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.into_iter()
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = &'a Symbol;
    type IntoIter = std::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}

fn collect_symtab<B: Read + Seek>(
    cmd: &SymtabCommand,
    format: Format,
    outer: &mut AddressSpace<B>,
    limits: &Limits,
    out: &mut Vec<Symbol>,
) -> Result<()> {
    if cmd.nsyms > limits.max_symbol_count {
        return Err(Error::ResourceLimit {
            resource: "symbol count",
            used: cmd.nsyms as u64,
            limit: limits.max_symbol_count as u64,
        });
    }
    if cmd.strsize > limits.max_string_table {
        return Err(Error::ResourceLimit {
            resource: "string table size",
            used: cmd.strsize as u64,
            limit: limits.max_string_table as u64,
        });
    }

    // The descriptor's offsets are file offsets into the outer dump;
    // the data is only reachable through the memory image, so map them
    // back to virtual addresses first.
    let str_vm = outer
        .file_to_vm(cmd.stroff as u64)
        .ok_or(Error::Unmapped {
            offset: cmd.stroff as u64,
        })?;
    let sym_vm = outer
        .file_to_vm(cmd.symoff as u64)
        .ok_or(Error::Unmapped {
            offset: cmd.symoff as u64,
        })?;
    trace!(
        stroff = format_args!("{:#x}", cmd.stroff),
        str_vm = format_args!("{str_vm:#x}"),
        symoff = format_args!("{:#x}", cmd.symoff),
        sym_vm = format_args!("{sym_vm:#x}"),
        nsyms = cmd.nsyms,
        "resolving symbol table"
    );

    let strsize = cmd.strsize as usize;
    let mut strtab = Vec::new();
    strtab
        .try_reserve_exact(strsize)
        .map_err(|_| Error::Alloc { bytes: strsize })?;
    strtab.resize(strsize, 0);

    let mut vm = outer.vm();
    let got = vm.read_at(str_vm, &mut strtab)?;
    if got < strsize {
        return Err(Error::Truncated {
            offset: str_vm + got as u64,
            needed: (strsize - got) as u64,
        });
    }

    let entry_size = Nlist::entry_size(format);
    vm.seek(SeekFrom::Start(sym_vm))?;
    let mut raw = [0u8; Nlist::SIZE64];
    for _ in 0..cmd.nsyms {
        let at = vm.address();
        vm.read_exact(&mut raw[..entry_size])
            .map_err(|e| Error::from_read(e, at, entry_size as u64))?;
        let entry = Nlist::parse(&raw, format);

        // Same filter chain as the original loader: exported entries
        // are ignored, only section-relative definitions count, the
        // name must resolve inside the string table, and debugger
        // stabs are dropped.
        if entry.is_external() {
            continue;
        }
        if !entry.is_section_defined() {
            continue;
        }
        let strx = entry.strx as usize;
        if strx >= strtab.len() {
            continue;
        }
        let name = nul_terminated(&strtab[strx..]);
        if strx == 0 || name.is_empty() {
            continue;
        }
        if entry.is_stab() {
            continue;
        }

        out.push(Symbol {
            vm_address: entry.value,
            name: String::from_utf8_lossy(name).into_owned(),
        });
    }

    Ok(())
}
