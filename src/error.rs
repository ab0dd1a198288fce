//! Error types for core dump parsing and symbol recovery.
//!
//! Every fallible operation returns an explicit [`Result`]; there is no
//! shared error channel, so reentrant use is safe by construction.

use thiserror::Error;

/// Main error type for coresym operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Read or seek failure on the real backing medium
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unrecognized magic or wrong declared image purpose
    #[error("Invalid image format: {0}")]
    InvalidFormat(String),

    /// A declared length or count exceeds the available bytes. Distinct
    /// from a clean end of data: the record walk is driven by the
    /// header's declared count, never by stream exhaustion.
    #[error("Truncated image at offset {offset:#x}: needed {needed} more bytes")]
    Truncated { offset: u64, needed: u64 },

    /// A file offset falls outside every segment's file range
    #[error("File offset {offset:#x} is not backed by any segment")]
    Unmapped { offset: u64 },

    /// Unable to obtain memory for a table
    #[error("Allocation of {bytes} bytes failed")]
    Alloc { bytes: usize },

    /// A declared size exceeds the configured parsing limits
    #[error("Resource limit exceeded: {resource} ({used}/{limit})")]
    ResourceLimit {
        resource: &'static str,
        used: u64,
        limit: u64,
    },
}

impl Error {
    /// Classify a failed read: an unexpected EOF means the image declared
    /// more data than the stream holds (truncation), anything else is a
    /// real I/O fault.
    pub(crate) fn from_read(err: std::io::Error, offset: u64, needed: u64) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Truncated { offset, needed }
        } else {
            Error::Io(err)
        }
    }
}

/// Result type alias for coresym operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidFormat("unrecognized magic 0xdeadbeef".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid image format: unrecognized magic 0xdeadbeef"
        );

        let err = Error::Truncated {
            offset: 0x1234,
            needed: 8,
        };
        assert_eq!(
            err.to_string(),
            "Truncated image at offset 0x1234: needed 8 more bytes"
        );

        let err = Error::Unmapped { offset: 0x40 };
        assert_eq!(err.to_string(), "File offset 0x40 is not backed by any segment");
    }

    #[test]
    fn test_from_read_classifies_eof_as_truncation() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            Error::from_read(eof, 0x10, 4),
            Error::Truncated {
                offset: 0x10,
                needed: 4
            }
        ));

        let other = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(Error::from_read(other, 0, 4), Error::Io(_)));
    }
}
