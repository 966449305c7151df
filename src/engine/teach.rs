//! TeachEngine translates bus commands into table operations.
//!
//! A two-state gate guards mutation: NNLRN enters learn mode, NNULN leaves
//! it, and learn/unlearn/clear commands received outside learn mode are
//! answered with a NotLearn error instead of being applied. Read-only
//! queries bypass the gate. EV numbers on the wire start at 1; the store
//! is 0-based.

use log::{debug, warn};

use crate::codec::ParsedEvent;
use crate::table::EventTable;
use crate::types::{EventKey, TableError, TableResult};

use super::dispatch::{CmdErr, Opcode, Response};

/// The teach-protocol gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Normal bus traffic; mutation commands are rejected.
    #[default]
    Normal,
    /// Learn mode; teach and unlearn commands are accepted.
    Learn,
}

/// Adapts bus opcodes to [`EventTable`] operations and produces the
/// response payloads for the transport to transmit.
///
/// # Example
///
/// ```
/// use evtable::{EventTable, Opcode, Response, TeachEngine};
///
/// let mut table = EventTable::default();
/// let mut engine = TeachEngine::new();
/// engine.dispatch(&mut table, Opcode::Nnlrn, &[]);
/// let replies = engine.dispatch(&mut table, Opcode::Evlrn, &[0, 1, 0, 100, 1, 42]);
/// assert_eq!(replies, vec![Response::Ack]);
/// ```
#[derive(Debug, Default)]
pub struct TeachEngine {
    mode: Mode,
}

impl TeachEngine {
    /// Create an engine in normal mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gate state.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Route one decoded bus command to its handler.
    ///
    /// `data` is the command payload following the opcode (and, for
    /// module-addressed commands, following the module's own node number;
    /// addressing is the outer loop's concern). Returns every response the
    /// command produces, in transmission order; an empty vector means the
    /// command calls for no reply.
    pub fn dispatch(&mut self, table: &mut EventTable, opcode: Opcode, data: &[u8]) -> Vec<Response> {
        match opcode {
            Opcode::Nnlrn => {
                self.mode = Mode::Learn;
                debug!("entering learn mode");
                Vec::new()
            }
            Opcode::Nnuln => {
                self.mode = Mode::Normal;
                debug!("leaving learn mode");
                Vec::new()
            }
            Opcode::Nnclr => self.do_nnclr(table),
            Opcode::Nnevn => vec![Response::EventSlotsLeft(table.free_slots() as u8)],
            Opcode::Rqevn => vec![Response::StoredCount(table.stored_count() as u8)],
            Opcode::Nerd => self.do_nerd(table),
            Opcode::Nenrd => match data {
                [ordinal] => self.do_nenrd(table, *ordinal),
                _ => vec![Response::CmdErr(CmdErr::InvalidCommand)],
            },
            Opcode::Reval => match data {
                [ordinal, ev_num] => self.do_reval(table, *ordinal, *ev_num),
                _ => vec![Response::CmdErr(CmdErr::InvalidCommand)],
            },
            Opcode::Evlrn => match data {
                [nh, nl, eh, el, ev_num, ev_val] => self.do_evlrn(
                    table,
                    EventKey::new(u16::from_be_bytes([*nh, *nl]), u16::from_be_bytes([*eh, *el])),
                    *ev_num,
                    *ev_val,
                ),
                _ => vec![Response::CmdErr(CmdErr::InvalidCommand)],
            },
            // The indexed variant carries an event ordinal the flat table
            // layout has no use for; the EV is still addressed by its
            // cross-row number.
            Opcode::Evlrni => match data {
                [nh, nl, eh, el, _ordinal, ev_num, ev_val] => self.do_evlrn(
                    table,
                    EventKey::new(u16::from_be_bytes([*nh, *nl]), u16::from_be_bytes([*eh, *el])),
                    *ev_num,
                    *ev_val,
                ),
                _ => vec![Response::CmdErr(CmdErr::InvalidCommand)],
            },
            Opcode::Evuln => match data {
                [nh, nl, eh, el] => self.do_evuln(
                    table,
                    EventKey::new(u16::from_be_bytes([*nh, *nl]), u16::from_be_bytes([*eh, *el])),
                ),
                _ => vec![Response::CmdErr(CmdErr::InvalidCommand)],
            },
            Opcode::Reqev => match data {
                [nh, nl, eh, el, ev_num] => self.do_reqev(
                    table,
                    EventKey::new(u16::from_be_bytes([*nh, *nl]), u16::from_be_bytes([*eh, *el])),
                    *ev_num,
                ),
                _ => vec![Response::CmdErr(CmdErr::InvalidCommand)],
            },
        }
    }

    /// The consumption path: look up an incoming bus event and return its
    /// record index for the host's action processing. `None` for events
    /// that were never taught.
    pub fn match_event(&self, table: &EventTable, parsed: &ParsedEvent) -> Option<u8> {
        table.find_event(parsed.key)
    }

    // ---------------- handlers ----------------

    /// Clear all events. Learn mode only.
    fn do_nnclr(&mut self, table: &mut EventTable) -> Vec<Response> {
        if self.mode != Mode::Learn {
            return vec![Response::CmdErr(CmdErr::NotLearn)];
        }
        table.clear_all();
        vec![Response::Ack]
    }

    /// Enumerate every stored event, one response per primary record.
    fn do_nerd(&self, table: &EventTable) -> Vec<Response> {
        let mut responses = Vec::new();
        for (index, key) in table.primaries() {
            let ordinal = match table.table_index_to_event_index(index) {
                Ok(ordinal) => ordinal,
                Err(_) => continue,
            };
            responses.push(Response::StoredEvent {
                nn: key.nn,
                en: key.en,
                ordinal,
            });
        }
        responses
    }

    /// Read one stored event by its external ordinal.
    fn do_nenrd(&self, table: &EventTable, ordinal: u8) -> Vec<Response> {
        match table
            .event_index_to_table_index(ordinal)
            .and_then(|index| table.key_of(index))
        {
            Ok(key) => vec![Response::StoredEvent {
                nn: key.nn,
                en: key.en,
                ordinal,
            }],
            Err(_) => vec![Response::CmdErr(CmdErr::InvalidEvent)],
        }
    }

    /// Read an event variable by ordinal and 1-based EV number.
    fn do_reval(&self, table: &mut EventTable, ordinal: u8, ev_num: u8) -> Vec<Response> {
        let Some(ev_index) = wire_ev_index(ev_num) else {
            return vec![Response::CmdErr(CmdErr::InvEvIndex)];
        };
        let result = table
            .event_index_to_table_index(ordinal)
            .and_then(|index| table.get_ev(index, ev_index));
        match self.settle(table, result) {
            Ok(value) => vec![Response::EvValueByIndex {
                ordinal,
                ev_num,
                value,
            }],
            Err(code) => vec![Response::CmdErr(code)],
        }
    }

    /// Teach one event variable: add-or-update the event, then write the
    /// value. Learn mode only.
    fn do_evlrn(
        &mut self,
        table: &mut EventTable,
        key: EventKey,
        ev_num: u8,
        ev_val: u8,
    ) -> Vec<Response> {
        if self.mode != Mode::Learn {
            return vec![Response::CmdErr(CmdErr::NotLearn)];
        }
        let Some(ev_index) = wire_ev_index(ev_num) else {
            return vec![Response::CmdErr(CmdErr::InvEvIndex)];
        };
        let result = table
            .add_event(key, false)
            .and_then(|index| table.write_ev(index, ev_index, ev_val));
        match self.settle(table, result) {
            Ok(()) => vec![Response::Ack],
            Err(code) => vec![Response::CmdErr(code)],
        }
    }

    /// Unlearn an event. Learn mode only; success is silent, failure is
    /// answered.
    fn do_evuln(&mut self, table: &mut EventTable, key: EventKey) -> Vec<Response> {
        if self.mode != Mode::Learn {
            return vec![Response::CmdErr(CmdErr::NotLearn)];
        }
        let result = table.remove_event(key);
        match self.settle(table, result) {
            Ok(()) => Vec::new(),
            Err(code) => vec![Response::CmdErr(code)],
        }
    }

    /// Read an event variable by key and 1-based EV number. Learn mode
    /// only (it addresses the event currently being taught). EV number 0
    /// enumerates: the reply carries the EV count followed by one answer
    /// per stored variable.
    fn do_reqev(&mut self, table: &mut EventTable, key: EventKey, ev_num: u8) -> Vec<Response> {
        if self.mode != Mode::Learn {
            return vec![Response::CmdErr(CmdErr::NotLearn)];
        }
        let Some(index) = table.find_event(key) else {
            return vec![Response::CmdErr(CmdErr::InvalidEvent)];
        };
        if ev_num == 0 {
            return self.enumerate_evs(table, key, index);
        }
        let result = table.get_ev(index, ev_num - 1);
        match self.settle(table, result) {
            Ok(value) => vec![Response::EvAnswer {
                nn: key.nn,
                en: key.en,
                ev_num,
                value,
            }],
            Err(code) => vec![Response::CmdErr(code)],
        }
    }

    /// Emit all variables of one event: first the count, then one answer
    /// per variable in write order.
    fn enumerate_evs(&self, table: &mut EventTable, key: EventKey, index: u8) -> Vec<Response> {
        let result = table.get_evs(index);
        let evs = match self.settle(table, result) {
            Ok(evs) => evs,
            Err(code) => return vec![Response::CmdErr(code)],
        };
        let mut responses = vec![Response::EvAnswer {
            nn: key.nn,
            en: key.en,
            ev_num: 0,
            value: evs.len() as u8,
        }];
        for (i, value) in evs.iter().enumerate() {
            responses.push(Response::EvAnswer {
                nn: key.nn,
                en: key.en,
                ev_num: i as u8 + 1,
                value: *value,
            });
        }
        responses
    }

    /// Translate a table result into a protocol code, recovering the
    /// table first when the failure was a broken invariant. Corruption
    /// degrades to an error response, never a panic.
    fn settle<T>(&self, table: &mut EventTable, result: TableResult<T>) -> Result<T, CmdErr> {
        result.map_err(|error| {
            if let TableError::CorruptTable(index) = error {
                warn!("corrupt table at record {index}, recovering");
                table.recover();
            }
            CmdErr::from_error(&error)
        })
    }
}

/// Convert a 1-based wire EV number to the store's 0-based index.
fn wire_ev_index(ev_num: u8) -> Option<u8> {
    ev_num.checked_sub(1)
}
