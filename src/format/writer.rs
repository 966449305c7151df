//! Writes an event table image from the in-memory table.

use std::io::Write;
use std::path::Path;

use crate::table::EventTable;
use crate::types::error::TableResult;
use crate::types::header::ImageHeader;

use super::record_size;

/// Writer for event table images.
///
/// The record array is persisted verbatim (flags, continuation link, key
/// and EV bytes exactly as held in memory), so the hash index never needs
/// to be stored: the reader re-derives it. A CRC32 of the record bytes in
/// the header catches torn or bit-flipped images on load.
pub struct ImageWriter;

impl ImageWriter {
    /// Write a complete table image to a file.
    pub fn write_to_file(table: &EventTable, path: impl AsRef<Path>) -> TableResult<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        Self::write_to(table, &mut writer)
    }

    /// Write a complete table image to any writer.
    pub fn write_to(table: &EventTable, writer: &mut impl Write) -> TableResult<()> {
        let config = table.config();
        let mut body = Vec::with_capacity(config.capacity * record_size(config.row_width));

        for record in table.records() {
            body.push(record.flags.as_byte());
            body.push(record.link);
            body.extend_from_slice(&record.key.nn.to_le_bytes());
            body.extend_from_slice(&record.key.en.to_le_bytes());
            body.extend_from_slice(&record.evs);
        }

        let header = ImageHeader::new(config, crc32fast::hash(&body))?;
        header.write_to(writer)?;
        writer.write_all(&body)?;
        writer.flush()?;
        Ok(())
    }
}
