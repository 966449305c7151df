//! All data types for the evtable library.

pub mod error;
pub mod header;
pub mod key;
pub mod record;

pub use error::{TableError, TableResult};
pub use header::{ImageHeader, HEADER_SIZE};
pub use key::EventKey;
pub use record::{EventRecord, RecordFlags};

/// Magic bytes at the start of every event table image.
pub const EVTB_MAGIC: [u8; 4] = [0x45, 0x56, 0x54, 0x42]; // "EVTB"

/// Current image format version.
pub const FORMAT_VERSION: u32 = 1;

/// Sentinel record index: empty bucket, end of chain, "not found".
///
/// Every valid record index is strictly below this value, which caps the
/// table capacity at 255 slots.
pub const NO_INDEX: u8 = 0xFF;

/// Default capacity of the record arena (number of table slots).
pub const DEFAULT_CAPACITY: usize = 255;

/// Default number of event-variable bytes held in one table row.
pub const DEFAULT_ROW_WIDTH: usize = 10;

/// Default total number of event variables addressable per event,
/// spread across continuation rows.
pub const DEFAULT_EVS_PER_EVENT: usize = 20;

/// Default number of hash buckets.
pub const DEFAULT_BUCKETS: usize = 32;

/// Fill value for event variables that have never been written.
pub const EV_FILL: u8 = 0;

/// Maximum row width: the per-row occupancy count is stored in 4 flag bits.
pub const MAX_ROW_WIDTH: usize = 15;

/// Geometry of an event table: slot count, row width, EV budget, bucket count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TableConfig {
    /// Number of record slots in the arena (1..=255).
    pub capacity: usize,
    /// Event-variable bytes per table row (1..=15).
    pub row_width: usize,
    /// Total event variables addressable per event.
    pub evs_per_event: usize,
    /// Number of hash buckets (fixed for the lifetime of the table).
    pub buckets: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            row_width: DEFAULT_ROW_WIDTH,
            evs_per_event: DEFAULT_EVS_PER_EVENT,
            buckets: DEFAULT_BUCKETS,
        }
    }
}

impl TableConfig {
    /// Validate the geometry.
    pub fn validate(&self) -> TableResult<()> {
        if self.capacity == 0 || self.capacity > NO_INDEX as usize {
            return Err(TableError::InvalidConfig("capacity must be 1..=255"));
        }
        if self.row_width == 0 || self.row_width > MAX_ROW_WIDTH {
            return Err(TableError::InvalidConfig("row_width must be 1..=15"));
        }
        if self.evs_per_event < self.row_width || self.evs_per_event > u8::MAX as usize {
            return Err(TableError::InvalidConfig(
                "evs_per_event must be one row..=255",
            ));
        }
        if self.buckets == 0 {
            return Err(TableError::InvalidConfig("buckets must be non-zero"));
        }
        Ok(())
    }
}
