//! Binary image I/O: the table's verbatim persisted form.

pub mod reader;
pub mod writer;

pub use reader::ImageReader;
pub use writer::ImageWriter;

/// Bytes one record occupies in the image: flags, link, NN, EN, then the
/// row of event variables.
pub(crate) fn record_size(row_width: usize) -> usize {
    6 + row_width
}
