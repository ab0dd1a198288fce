//! Structural-record (load command) reading.

use bytes::Bytes;
use std::io::{Read, Seek};

use crate::config::Limits;
use crate::error::{Error, Result};

/// Fixed prefix shared by every load command: type tag + total length.
pub const LC_HEADER_SIZE: u32 = 8;

/// One decoded load command: tag, declared total length, raw payload.
///
/// Interpretation of the payload is the caller's job, keyed by `cmd`.
/// The declared `cmdsize` is not validated against known per-type
/// sizes, so payload accessors must length-check before reinterpreting
/// it as a fixed-size structure.
#[derive(Debug, Clone)]
pub struct LoadCommand {
    pub cmd: u32,
    pub cmdsize: u32,
    pub payload: Bytes,
}

impl LoadCommand {
    /// Read one command at the stream's current position.
    ///
    /// Running out of bytes mid-record is a truncation error, not a
    /// clean end: the caller knows how many records to expect from the
    /// header's declared count, never from stream exhaustion.
    pub fn read<S: Read + Seek>(stream: &mut S, limits: &Limits) -> Result<Self> {
        let at = stream.stream_position()?;

        let mut hdr = [0u8; LC_HEADER_SIZE as usize];
        stream
            .read_exact(&mut hdr)
            .map_err(|e| Error::from_read(e, at, LC_HEADER_SIZE as u64))?;
        let cmd = u32::from_le_bytes(hdr[0..4].try_into().unwrap());
        let cmdsize = u32::from_le_bytes(hdr[4..8].try_into().unwrap());

        // A record cannot be shorter than its own fixed prefix.
        if cmdsize < LC_HEADER_SIZE {
            return Err(Error::Truncated {
                offset: at,
                needed: (LC_HEADER_SIZE - cmdsize) as u64,
            });
        }
        if cmdsize > limits.max_command_size {
            return Err(Error::ResourceLimit {
                resource: "load command size",
                used: cmdsize as u64,
                limit: limits.max_command_size as u64,
            });
        }

        let body = (cmdsize - LC_HEADER_SIZE) as usize;
        let mut payload = Vec::new();
        payload
            .try_reserve_exact(body)
            .map_err(|_| Error::Alloc { bytes: body })?;
        payload.resize(body, 0);
        stream
            .read_exact(&mut payload)
            .map_err(|e| Error::from_read(e, at, body as u64))?;

        Ok(Self {
            cmd,
            cmdsize,
            payload: Bytes::from(payload),
        })
    }
}
