//! Error types for the evtable library.

use thiserror::Error;

/// All errors that can occur in the evtable library.
#[derive(Error, Debug)]
pub enum TableError {
    /// No free record slot (or continuation slot) is available.
    #[error("Event table full")]
    TableFull,

    /// No stored event matches the given (node number, event number) key.
    #[error("Event ({nn}, {en}) not found")]
    EventNotFound { nn: u16, en: u16 },

    /// A record index does not refer to the start of a stored event.
    #[error("Record index {0} is not a stored event")]
    RecordNotFound(u8),

    /// Event-variable index outside the per-event EV budget.
    #[error("Event-variable index {0} out of range")]
    InvalidEvIndex(u8),

    /// Event-variable index inside the budget but beyond what was written.
    #[error("Event variable {0} not present")]
    NoEv(u8),

    /// Malformed bus event identifier.
    #[error("Invalid event identifier: opcode {0:#04x}")]
    InvalidIdentifier(u8),

    /// A hash or chain invariant was violated; the offending record index.
    #[error("Corrupt table detected at record {0}")]
    CorruptTable(u8),

    /// Invalid table geometry.
    #[error("Invalid table configuration: {0}")]
    InvalidConfig(&'static str),

    /// Invalid magic bytes in image header.
    #[error("Invalid magic bytes in image header")]
    InvalidMagic,

    /// Unsupported image format version.
    #[error("Unsupported image format version: {0}")]
    UnsupportedVersion(u32),

    /// Image geometry exceeds what the format can describe.
    #[error("Image geometry out of range")]
    GeometryMismatch,

    /// Image is empty or truncated.
    #[error("Image is empty or truncated")]
    Truncated,

    /// Record bytes do not match the image checksum.
    #[error("Image checksum mismatch")]
    ChecksumMismatch,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for evtable operations.
pub type TableResult<T> = Result<T, TableError>;
