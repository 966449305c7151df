//! Header of a persisted event table image.

use std::io::{Read, Write};

use super::error::{TableError, TableResult};
use super::{TableConfig, EVTB_MAGIC, FORMAT_VERSION, NO_INDEX};

/// The fixed size of an ImageHeader on disk: 24 bytes.
pub const HEADER_SIZE: u64 = 24;

/// Header of an event table image. Fixed size: 24 bytes.
///
/// The header is self-describing: capacity, row width and bucket count are
/// read back from the image, not assumed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Magic bytes: "EVTB".
    pub magic: [u8; 4],
    /// Format version (currently 1).
    pub version: u32,
    /// Number of record slots.
    pub capacity: u8,
    /// Event-variable bytes per row.
    pub row_width: u8,
    /// Number of hash buckets the table was built with.
    pub buckets: u16,
    /// Total EVs addressable per event.
    pub evs_per_event: u16,
    /// CRC32 of the record bytes that follow the header.
    pub record_crc: u32,
}

impl ImageHeader {
    /// Build a header describing the given table geometry.
    pub fn new(config: &TableConfig, record_crc: u32) -> TableResult<Self> {
        if config.capacity > NO_INDEX as usize
            || config.row_width > u8::MAX as usize
            || config.buckets > u16::MAX as usize
            || config.evs_per_event > u16::MAX as usize
        {
            return Err(TableError::GeometryMismatch);
        }
        Ok(Self {
            magic: EVTB_MAGIC,
            version: FORMAT_VERSION,
            capacity: config.capacity as u8,
            row_width: config.row_width as u8,
            buckets: config.buckets as u16,
            evs_per_event: config.evs_per_event as u16,
            record_crc,
        })
    }

    /// The table geometry this header describes.
    pub fn config(&self) -> TableConfig {
        TableConfig {
            capacity: self.capacity as usize,
            row_width: self.row_width as usize,
            evs_per_event: self.evs_per_event as usize,
            buckets: self.buckets as usize,
        }
    }

    /// Write this header to the given writer. Writes exactly 24 bytes.
    ///
    /// Layout (all little-endian):
    /// - 0x00..0x04: magic (4 bytes)
    /// - 0x04..0x08: version (u32)
    /// - 0x08: capacity (u8)
    /// - 0x09: row_width (u8)
    /// - 0x0A..0x0C: buckets (u16)
    /// - 0x0C..0x0E: evs_per_event (u16)
    /// - 0x0E..0x10: _reserved (u16, written as 0)
    /// - 0x10..0x14: record_crc (u32)
    /// - 0x14..0x18: _reserved (u32, written as 0)
    pub fn write_to(&self, writer: &mut impl Write) -> TableResult<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&[self.capacity, self.row_width])?;
        writer.write_all(&self.buckets.to_le_bytes())?;
        writer.write_all(&self.evs_per_event.to_le_bytes())?;
        writer.write_all(&0u16.to_le_bytes())?; // _reserved
        writer.write_all(&self.record_crc.to_le_bytes())?;
        writer.write_all(&0u32.to_le_bytes())?; // _reserved
        Ok(())
    }

    /// Read a header from the given reader. Reads exactly 24 bytes.
    pub fn read_from(reader: &mut impl Read) -> TableResult<Self> {
        let mut buf = [0u8; HEADER_SIZE as usize];
        reader.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TableError::Truncated
            } else {
                TableError::Io(e)
            }
        })?;

        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != EVTB_MAGIC {
            return Err(TableError::InvalidMagic);
        }

        let version = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if version != FORMAT_VERSION {
            return Err(TableError::UnsupportedVersion(version));
        }

        let capacity = buf[8];
        let row_width = buf[9];
        let buckets = u16::from_le_bytes([buf[10], buf[11]]);
        let evs_per_event = u16::from_le_bytes([buf[12], buf[13]]);
        // bytes 14..16 are reserved
        let record_crc = u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]);
        // bytes 20..24 are reserved

        Ok(Self {
            magic,
            version,
            capacity,
            row_width,
            buckets,
            evs_per_event,
            record_crc,
        })
    }
}
