//! Reads an event table image back into an in-memory table.

use std::io::Read;
use std::path::Path;

use crate::table::EventTable;
use crate::types::error::{TableError, TableResult};
use crate::types::header::{ImageHeader, HEADER_SIZE};
use crate::types::{EventKey, EventRecord, RecordFlags};

use super::record_size;

/// Reader for event table images.
pub struct ImageReader;

impl ImageReader {
    /// Read an image file into an [`EventTable`].
    pub fn read_from_file(path: impl AsRef<Path>) -> TableResult<EventTable> {
        let data = std::fs::read(path)?;
        let mut cursor = std::io::Cursor::new(data);
        Self::read_from(&mut cursor)
    }

    /// Read from any reader into an [`EventTable`]. The hash index is
    /// rebuilt from the records; it is never part of the image.
    pub fn read_from(reader: &mut impl Read) -> TableResult<EventTable> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        if (data.len() as u64) < HEADER_SIZE {
            return Err(TableError::Truncated);
        }
        let header = ImageHeader::read_from(&mut std::io::Cursor::new(
            &data[..HEADER_SIZE as usize],
        ))?;
        let config = header.config();
        config.validate()?;

        let body = &data[HEADER_SIZE as usize..];
        let stride = record_size(config.row_width);
        if body.len() != config.capacity * stride {
            return Err(TableError::Truncated);
        }
        if crc32fast::hash(body) != header.record_crc {
            return Err(TableError::ChecksumMismatch);
        }

        let mut records = Vec::with_capacity(config.capacity);
        for chunk in body.chunks_exact(stride) {
            records.push(EventRecord {
                flags: RecordFlags::from_byte(chunk[0]),
                link: chunk[1],
                key: EventKey::new(
                    u16::from_le_bytes([chunk[2], chunk[3]]),
                    u16::from_le_bytes([chunk[4], chunk[5]]),
                ),
                evs: chunk[6..].to_vec(),
            });
        }

        EventTable::from_parts(config, records)
    }
}
