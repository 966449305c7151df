//! evtable: persistent event table for CAN automation bus modules.
//!
//! Maps protocol events, identified by a (node number, event number) pair,
//! to a bounded sequence of configuration bytes. Lookup goes through a
//! hash index with chained collision resolution; variable storage beyond
//! one row spills into continuation records; the whole record arena
//! persists verbatim as a binary image and the index is rebuilt on load.
//! Runtime mutation happens through the teach/learn protocol in
//! [`engine`].

pub mod codec;
pub mod engine;
pub mod format;
pub mod index;
pub mod table;
pub mod types;

// Re-export commonly used types at the crate root
pub use codec::{is_event_opcode, parse_event, ParsedEvent};
pub use engine::{CmdErr, Mode, Opcode, Response, TeachEngine};
pub use format::{ImageReader, ImageWriter};
pub use index::{bucket_hash, HashIndex};
pub use table::EventTable;
pub use types::{
    EventKey, EventRecord, ImageHeader, RecordFlags, TableConfig, TableError, TableResult,
    DEFAULT_BUCKETS, DEFAULT_CAPACITY, DEFAULT_EVS_PER_EVENT, DEFAULT_ROW_WIDTH, EV_FILL,
    FORMAT_VERSION, HEADER_SIZE, NO_INDEX,
};
