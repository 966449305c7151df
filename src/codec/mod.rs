//! Event identifier parsing: classifies raw bus event frames.
//!
//! An event opcode has bits 7 and 4 set and bits 1 and 2 clear. Within that
//! shape, bit 0 distinguishes OFF from ON, bit 3 marks a short event (no
//! node-number qualification) and bits 5-6 give the number of appended data
//! bytes:
//!
//! ```text
//! ACON  0x90   1001 0000      ASON  0x98   1001 1000
//! ACOF  0x91   1001 0001      ASOF  0x99   1001 1001
//! ACON1 0xB0   1011 0000      ...
//! ACON2 0xD0   1101 0000
//! ACON3 0xF0   1111 0000
//! ```

use serde::Serialize;

use crate::types::{EventKey, TableError, TableResult};

/// Bits that must be set in an event opcode.
const EVENT_SET_MASK: u8 = 0b1001_0000;
/// Bits that must be clear in an event opcode.
const EVENT_CLR_MASK: u8 = 0b0000_0110;
/// Set for OFF events, clear for ON events.
const EVENT_OFF_MASK: u8 = 0b0000_0001;
/// Set for short events.
const EVENT_SHORT_MASK: u8 = 0b0000_1000;

/// A bus event identifier decoded into canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedEvent {
    /// The lookup key. Short events carry `nn == 0`.
    pub key: EventKey,
    /// Whether the identifier was a short event.
    pub short: bool,
    /// ON (`true`) or OFF (`false`) polarity.
    pub on: bool,
    /// Additional payload bytes appended to the event (0 to 3).
    pub extra: Vec<u8>,
}

/// Whether an opcode has the event bit shape at all.
pub fn is_event_opcode(opcode: u8) -> bool {
    opcode & EVENT_SET_MASK == EVENT_SET_MASK && opcode & EVENT_CLR_MASK == 0
}

/// Number of data bytes appended after the event number, from bits 5-6.
fn extra_byte_count(opcode: u8) -> usize {
    ((opcode >> 5) & 0x03) as usize
}

/// Parse a raw event frame into its canonical (NN, EN, short, on) form.
///
/// `data` is the payload following the opcode byte: NN (big-endian), EN
/// (big-endian), then the appended data bytes the opcode announces. Fails
/// with [`TableError::InvalidIdentifier`] on a malformed bit pattern or a
/// payload of the wrong length. Pure function, no side effects.
pub fn parse_event(opcode: u8, data: &[u8]) -> TableResult<ParsedEvent> {
    if !is_event_opcode(opcode) {
        return Err(TableError::InvalidIdentifier(opcode));
    }
    let extra = extra_byte_count(opcode);
    if data.len() != 4 + extra {
        return Err(TableError::InvalidIdentifier(opcode));
    }

    let short = opcode & EVENT_SHORT_MASK != 0;
    let nn = if short {
        // A short event omits node-number qualification.
        0
    } else {
        u16::from_be_bytes([data[0], data[1]])
    };
    let en = u16::from_be_bytes([data[2], data[3]]);

    Ok(ParsedEvent {
        key: EventKey::new(nn, en),
        short,
        on: opcode & EVENT_OFF_MASK == 0,
        extra: data[4..].to_vec(),
    })
}
