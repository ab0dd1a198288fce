//! Scanning resident images for symbol tables.
//!
//! A core dump's readable-and-executable segments are the places
//! compiled code lived, and therefore the places a Mach-O header of a
//! loaded image may still sit in memory. The scan reinterprets each
//! candidate segment as a nested image through a window over the
//! virtual view and gathers every internal symbol name the nested
//! images declare. Reinterpretation goes exactly one level deep and a
//! nested image is never itself rescanned, so a crafted image whose
//! segments point back at themselves cannot recurse.

use std::io::{Read, Seek};
use tracing::{debug, trace, warn};

use crate::config::Limits;
use crate::core::AddressSpace;
use crate::error::Result;
use crate::io::bound::TailStream;
use crate::macho::image::Image;
use crate::symbols::SymbolTable;

/// Collect the internal symbol names of every image found resident in
/// the dump's executable memory.
///
/// Segments that do not parse as images are expected and skipped;
/// per-segment failures never abort the overall scan.
pub fn scan_symbols<S: Read + Seek>(space: &mut AddressSpace<S>) -> Vec<String> {
    scan_symbols_with_limits(space, &Limits::default())
}

/// [`scan_symbols`] under explicit limits.
pub fn scan_symbols_with_limits<S: Read + Seek>(
    space: &mut AddressSpace<S>,
    limits: &Limits,
) -> Vec<String> {
    let candidates: Vec<(String, u64)> = space
        .segments()
        .iter()
        .filter(|seg| seg.prot.is_code())
        .map(|seg| (seg.name.clone(), seg.vm_address))
        .collect();
    debug!(candidates = candidates.len(), "scanning executable segments");

    let mut names = Vec::new();
    for (name, base) in candidates {
        let image = match reinterpret_segment(space, base, limits) {
            Ok(image) => image,
            Err(err) => {
                // Most executable segments hold code, not a header.
                trace!(
                    segment = %name,
                    base = format_args!("{base:#x}"),
                    %err,
                    "segment does not parse as an image"
                );
                continue;
            }
        };
        debug!(
            segment = %name,
            base = format_args!("{base:#x}"),
            symtabs = image.symtabs.len(),
            "nested image found"
        );

        // The nested image's declared table offsets are addresses into
        // the outer memory, so resolution goes through the outer
        // address space, not the window.
        match SymbolTable::from_commands(&image.symtabs, image.header.format, space, limits) {
            Ok(table) => names.extend(table.into_iter().map(|sym| sym.name)),
            Err(err) => {
                warn!(segment = %name, %err, "symbol extraction failed, skipping segment");
            }
        }
    }
    names
}

/// Try to parse the memory at `base` as a complete image, through a
/// one-sided window so the parser sees an independent zero-based
/// stream.
fn reinterpret_segment<S: Read + Seek>(
    space: &mut AddressSpace<S>,
    base: u64,
    limits: &Limits,
) -> Result<Image> {
    let mut vm = space.vm();
    let mut window = TailStream::new(&mut vm, base)?;
    Image::parse_with_limits(&mut window, limits)
}
