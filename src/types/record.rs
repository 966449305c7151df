//! Event records and their flag byte.

use serde::Serialize;

use super::{EventKey, EV_FILL, NO_INDEX};

const EVS_USED_MASK: u8 = 0x0F;
const CONTINUED_BIT: u8 = 0x10;
const CONTINUATION_BIT: u8 = 0x20;
const PRODUCER_BIT: u8 = 0x40;
const FREE_BIT: u8 = 0x80;

/// One byte of per-record state, persisted verbatim in the image.
///
/// Layout: bits 0-3 hold the per-row EV occupancy count, bit 4 marks a
/// record that is continued by another row, bit 5 marks a continuation row,
/// bit 6 carries the producer classification, bit 7 marks a free slot.
/// A free slot is written as `0xFF` so that erased non-volatile memory
/// reads back as an empty table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordFlags(u8);

impl RecordFlags {
    /// Flags of a free slot.
    pub const FREE: Self = Self(0xFF);

    /// Flags of a freshly allocated primary record.
    pub fn primary(producer: bool) -> Self {
        let mut f = Self(0);
        f.set_producer(producer);
        f
    }

    /// Flags of a freshly allocated continuation row.
    pub fn continuation() -> Self {
        Self(CONTINUATION_BIT)
    }

    /// Rebuild from a raw byte (image load).
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// The raw byte as persisted.
    pub fn as_byte(&self) -> u8 {
        self.0
    }

    /// Whether this slot is unused. Takes priority over every other flag.
    pub fn is_free(&self) -> bool {
        self.0 & FREE_BIT != 0
    }

    /// Whether this row is a continuation of a previous row.
    pub fn is_continuation(&self) -> bool {
        self.0 & CONTINUATION_BIT != 0
    }

    /// Whether another row continues this one.
    pub fn is_continued(&self) -> bool {
        self.0 & CONTINUED_BIT != 0
    }

    /// Whether the stored event is classified as produced by this module.
    /// Stored and surfaced for configuration display, never interpreted here.
    pub fn is_producer(&self) -> bool {
        self.0 & PRODUCER_BIT != 0
    }

    /// How many EVs of this row are in use (high-water mark, 0..=15).
    pub fn evs_used(&self) -> u8 {
        self.0 & EVS_USED_MASK
    }

    /// Mark this row as continued by another.
    pub fn set_continued(&mut self, continued: bool) {
        if continued {
            self.0 |= CONTINUED_BIT;
        } else {
            self.0 &= !CONTINUED_BIT;
        }
    }

    /// Set the producer classification bit.
    pub fn set_producer(&mut self, producer: bool) {
        if producer {
            self.0 |= PRODUCER_BIT;
        } else {
            self.0 &= !PRODUCER_BIT;
        }
    }

    /// Raise the per-row occupancy count to cover `count` EVs.
    pub fn raise_evs_used(&mut self, count: u8) {
        if count > self.evs_used() {
            self.0 = (self.0 & !EVS_USED_MASK) | (count & EVS_USED_MASK);
        }
    }
}

/// One slot of the event table.
///
/// A primary record holds the (NN, EN) key and the first row of event
/// variables. Continuation records extend the variable storage of their
/// primary; they carry no meaningful key of their own. `link` is the index
/// of the next continuation row and is persisted with the record, so a
/// rebuild of the hash index never has to touch record contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// Per-record flag byte.
    pub flags: RecordFlags,
    /// Next continuation row, or [`NO_INDEX`].
    pub link: u8,
    /// The (NN, EN) key. Only meaningful on primary records.
    pub key: EventKey,
    /// Event-variable bytes of this row (`row_width` long).
    pub evs: Vec<u8>,
}

impl EventRecord {
    /// A free slot with the given row width.
    pub fn free(row_width: usize) -> Self {
        Self {
            flags: RecordFlags::FREE,
            link: NO_INDEX,
            key: EventKey::new(0xFFFF, 0xFFFF),
            evs: vec![EV_FILL; row_width],
        }
    }

    /// Whether this slot is the start of a stored event: not free and not
    /// a continuation row.
    pub fn is_primary(&self) -> bool {
        !self.flags.is_free() && !self.flags.is_continuation()
    }

    /// Reset this slot to the free state, wiping key and EVs.
    pub fn release(&mut self) {
        let width = self.evs.len();
        *self = Self::free(width);
    }
}
