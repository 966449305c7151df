//! Bus opcodes, protocol error codes and response payloads.
//!
//! Only the event-teaching subset of the bus command set lives here; the
//! outer dispatch loop routes everything else. Responses are structured
//! data handed back to the transport collaborator, which owns framing and
//! the module's own node number.

use serde::Serialize;

use crate::types::TableError;

/// Event-teaching opcodes handled by the [`TeachEngine`](super::TeachEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum Opcode {
    /// Put the module into learn mode.
    Nnlrn = 0x53,
    /// Release the module from learn mode.
    Nnuln = 0x54,
    /// Clear all stored events (learn mode only).
    Nnclr = 0x55,
    /// Read the number of available event slots.
    Nnevn = 0x56,
    /// Read all stored events.
    Nerd = 0x57,
    /// Read the number of stored events.
    Rqevn = 0x58,
    /// Request read of a stored event by its ordinal.
    Nenrd = 0x72,
    /// Unlearn an event (learn mode only).
    Evuln = 0x95,
    /// Read an event variable by ordinal and EV number.
    Reval = 0x9C,
    /// Read an event variable by event key (learn mode only).
    Reqev = 0xB2,
    /// Teach an event variable (learn mode only).
    Evlrn = 0xD2,
    /// Teach an event variable by explicit index (learn mode only).
    Evlrni = 0xF5,
}

impl Opcode {
    /// Convert a raw opcode byte, returning None for opcodes this
    /// subsystem does not handle.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x53 => Some(Self::Nnlrn),
            0x54 => Some(Self::Nnuln),
            0x55 => Some(Self::Nnclr),
            0x56 => Some(Self::Nnevn),
            0x57 => Some(Self::Nerd),
            0x58 => Some(Self::Rqevn),
            0x72 => Some(Self::Nenrd),
            0x95 => Some(Self::Evuln),
            0x9C => Some(Self::Reval),
            0xB2 => Some(Self::Reqev),
            0xD2 => Some(Self::Evlrn),
            0xF5 => Some(Self::Evlrni),
            _ => None,
        }
    }
}

/// Protocol error codes carried in a negative response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum CmdErr {
    /// Command not available: not a recognised request.
    InvalidCommand = 1,
    /// Mutation attempted outside learn mode.
    NotLearn = 2,
    /// No free record or continuation slot.
    TooManyEvents = 4,
    /// Event variable inside the budget but never written.
    NoEv = 5,
    /// Event-variable index out of range (0 or past the budget).
    InvEvIndex = 6,
    /// The addressed event is not stored.
    InvalidEvent = 7,
}

impl CmdErr {
    /// Translate a table failure into the matching protocol code.
    pub fn from_error(error: &TableError) -> Self {
        match error {
            TableError::TableFull => Self::TooManyEvents,
            TableError::NoEv(_) => Self::NoEv,
            TableError::InvalidEvIndex(_) => Self::InvEvIndex,
            TableError::EventNotFound { .. } | TableError::RecordNotFound(_) => Self::InvalidEvent,
            _ => Self::InvalidEvent,
        }
    }
}

/// A response payload handed back to the transport for transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Response {
    /// Write acknowledge (WRACK, 0x59).
    Ack,
    /// Negative response (CMDERR, 0x6F).
    CmdErr(CmdErr),
    /// Number of free event slots (EVNLF, 0x70).
    EventSlotsLeft(u8),
    /// Number of stored events (NUMEV, 0x74).
    StoredCount(u8),
    /// One stored event, with its external ordinal (ENRSP, 0xF2).
    StoredEvent { nn: u16, en: u16, ordinal: u8 },
    /// An event variable read by ordinal (NEVAL, 0xB5).
    EvValueByIndex { ordinal: u8, ev_num: u8, value: u8 },
    /// An event variable read by key in learn mode (EVANS, 0xD3).
    EvAnswer { nn: u16, en: u16, ev_num: u8, value: u8 },
}

impl Response {
    /// The bus opcode this response is transmitted under.
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Ack => 0x59,
            Self::CmdErr(_) => 0x6F,
            Self::EventSlotsLeft(_) => 0x70,
            Self::StoredCount(_) => 0x74,
            Self::StoredEvent { .. } => 0xF2,
            Self::EvValueByIndex { .. } => 0xB5,
            Self::EvAnswer { .. } => 0xD3,
        }
    }
}
