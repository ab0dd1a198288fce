//! Core dump symbol recovery.
//!
//! `coresym` parses a Mach-O process core dump, reconstructs the
//! virtual address space it snapshots, and recovers the internal
//! (static) symbol tables of executable images still resident in that
//! memory, so a crash analyzer can resolve raw addresses to routine
//! names without a live process.
//!
//! The pieces compose along one seam, `std::io::Read + Seek`: a
//! memory-mapped file, the virtual-address view over it, and bounded
//! windows carved out of either all present themselves as ordinary
//! seekable streams, which is what lets a region of dumped memory be
//! re-parsed as a complete image.
//!
//! ```no_run
//! use coresym::{scan_symbols, AddressSpace, MappedFile};
//!
//! # fn main() -> coresym::Result<()> {
//! let file = MappedFile::open("process.core")?;
//! let mut space = AddressSpace::open(file)?;
//! for name in scan_symbols(&mut space) {
//!     println!("{name}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod logging;
pub mod macho;
pub mod scan;
pub mod symbols;

pub use self::config::Limits;
pub use self::core::{AddressSpace, VmView};
pub use self::error::{Error, Result};
pub use self::io::bound::{BoundedStream, TailStream};
pub use self::io::MappedFile;
pub use self::macho::types::{Format, Segment, VmProt};
pub use self::scan::{scan_symbols, scan_symbols_with_limits};
pub use self::symbols::{Symbol, SymbolTable};
