//! EventTable: the fixed-capacity record arena plus its hash index.
//!
//! The arena is an explicitly sized array of [`EventRecord`] slots addressed
//! by `u8` index; free slots form an implicit free list (first-free
//! allocation). All references between records are index-based so the whole
//! record array serializes verbatim to non-volatile storage. The hash index
//! is derived state, rebuilt from the records on load and after any detected
//! inconsistency.
//!
//! Mutation discipline (the table runs in a single cooperative context, but
//! a lookup may nest inside a mutation): a record's fields are fully written
//! before it is linked into any chain, and unlinking happens before a slot
//! is marked free. No step leaves a half-written record observable.

use log::{debug, warn};

use crate::index::HashIndex;
use crate::types::{
    EventKey, EventRecord, RecordFlags, TableConfig, TableError, TableResult, EV_FILL, NO_INDEX,
};

/// The persistent event table.
///
/// # Example
///
/// ```
/// use evtable::{EventKey, EventTable};
///
/// let mut table = EventTable::default();
/// let idx = table.add_event(EventKey::new(1, 100), false).unwrap();
/// table.write_ev(idx, 0, 42).unwrap();
/// assert_eq!(table.find_event(EventKey::new(1, 100)), Some(idx));
/// assert_eq!(table.get_ev(idx, 0).unwrap(), 42);
/// ```
#[derive(Debug, Clone)]
pub struct EventTable {
    config: TableConfig,
    records: Vec<EventRecord>,
    index: HashIndex,
}

impl Default for EventTable {
    fn default() -> Self {
        Self::new(TableConfig::default()).expect("default config is valid")
    }
}

impl EventTable {
    /// Create an empty table with the given geometry.
    pub fn new(config: TableConfig) -> TableResult<Self> {
        config.validate()?;
        Ok(Self {
            records: vec![EventRecord::free(config.row_width); config.capacity],
            index: HashIndex::new(config.buckets, config.capacity),
            config,
        })
    }

    /// Reconstitute a table from a persisted record array (used by the
    /// image reader).
    ///
    /// The hash index is rebuilt from scratch. If the rebuild scan reports
    /// a broken chain invariant the offending records are released and the
    /// scan retried, so a damaged image degrades to a smaller but
    /// consistent table instead of failing the load.
    pub fn from_parts(config: TableConfig, records: Vec<EventRecord>) -> TableResult<Self> {
        config.validate()?;
        if records.len() != config.capacity
            || records.iter().any(|r| r.evs.len() != config.row_width)
        {
            return Err(TableError::GeometryMismatch);
        }
        let mut table = Self {
            index: HashIndex::new(config.buckets, config.capacity),
            records,
            config,
        };
        table.recover();
        Ok(table)
    }

    /// The table geometry.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Number of record slots.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// The record array, persisted verbatim by the image writer.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    // ---------------- lookup ----------------

    /// Find the primary record holding `key`.
    pub fn find_event(&self, key: EventKey) -> Option<u8> {
        self.index.find(&self.records, key)
    }

    /// One step along the continuation chain of a record.
    pub fn find_event_continuation(&self, index: u8) -> Option<u8> {
        if (index as usize) >= self.records.len() {
            return None;
        }
        self.index.continuation_of(&self.records, index)
    }

    /// Whether `index` is the start of a stored event.
    pub fn is_primary(&self, index: u8) -> bool {
        (index as usize) < self.records.len() && self.records[index as usize].is_primary()
    }

    /// The key of a stored event.
    pub fn key_of(&self, index: u8) -> TableResult<EventKey> {
        self.primary(index).map(|r| r.key)
    }

    /// The stored producer classification of an event. Surfaced for
    /// configuration display; never interpreted here.
    pub fn is_producer(&self, index: u8) -> TableResult<bool> {
        self.primary(index).map(|r| r.flags.is_producer())
    }

    /// Iterate over (table index, key) of every stored event, in slot order.
    pub fn primaries(&self) -> impl Iterator<Item = (u8, EventKey)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_primary())
            .map(|(i, r)| (i as u8, r.key))
    }

    /// Number of free record slots.
    pub fn free_slots(&self) -> usize {
        self.records.iter().filter(|r| r.flags.is_free()).count()
    }

    /// Number of stored events. This differs from the number of used
    /// slots: continuation rows do not count.
    pub fn stored_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_primary()).count()
    }

    // ---------------- enumeration ordinals ----------------

    /// Map an internal slot to its externally visible event ordinal:
    /// a 1-based position over the currently occupied primaries, skipping
    /// free and continuation slots.
    pub fn table_index_to_event_index(&self, index: u8) -> TableResult<u8> {
        self.primary(index)?;
        let ordinal = self.records[..=index as usize]
            .iter()
            .filter(|r| r.is_primary())
            .count();
        Ok(ordinal as u8)
    }

    /// Inverse of [`Self::table_index_to_event_index`].
    pub fn event_index_to_table_index(&self, ordinal: u8) -> TableResult<u8> {
        if ordinal == 0 {
            return Err(TableError::RecordNotFound(ordinal));
        }
        self.primaries()
            .nth(ordinal as usize - 1)
            .map(|(i, _)| i)
            .ok_or(TableError::RecordNotFound(ordinal))
    }

    // ---------------- mutation ----------------

    /// Add an event, or return its existing record.
    ///
    /// A repeated add on a known key is not a duplicate-create: the
    /// existing primary is returned and subsequent variable writes update
    /// it in place. A new event takes the first free slot and is fully
    /// initialised (key and default EVs written, flags set) before it is
    /// linked into its bucket chain. Fails with [`TableError::TableFull`]
    /// when no slot is free.
    pub fn add_event(&mut self, key: EventKey, producer: bool) -> TableResult<u8> {
        if let Some(existing) = self.find_event(key) {
            return Ok(existing);
        }
        let index = self.first_free().ok_or(TableError::TableFull)?;

        let record = &mut self.records[index as usize];
        record.key = key;
        record.link = NO_INDEX;
        record.evs.fill(EV_FILL);
        record.flags = RecordFlags::primary(producer);

        // Fields are complete; linking makes the record observable.
        self.index.link_primary(key, index);
        debug!("add_event {key} -> slot {index}");
        Ok(index)
    }

    /// Remove an event entirely: the primary and every continuation row
    /// it owns become free. Fails with [`TableError::EventNotFound`] if
    /// the key is absent.
    pub fn remove_event(&mut self, key: EventKey) -> TableResult<()> {
        let index = self
            .find_event(key)
            .ok_or(TableError::EventNotFound { nn: key.nn, en: key.en })?;
        self.remove_record(index)
    }

    /// Remove the event starting at `index` (by-slot variant of
    /// [`Self::remove_event`]).
    pub fn remove_record(&mut self, index: u8) -> TableResult<()> {
        let key = self.primary(index)?.key;

        // Unlink before any slot is marked free.
        self.index.unlink_primary(key, index)?;

        let mut cursor = index;
        loop {
            let next = self.records[cursor as usize].link;
            self.records[cursor as usize].release();
            if next == NO_INDEX {
                break;
            }
            cursor = next;
        }
        // Drop the continuation mirror entries; easiest from scratch.
        self.rebuild()?;
        debug!("remove_record: slot {index} ({key}) freed");
        Ok(())
    }

    /// Write one event-variable byte at `ev_index` (0-based, cross-row).
    ///
    /// When the index lands beyond the rows currently allocated, fresh
    /// continuation rows are allocated and linked first. Fails with
    /// [`TableError::InvalidEvIndex`] past the per-event budget and
    /// [`TableError::TableFull`] when a needed continuation slot cannot
    /// be allocated.
    pub fn write_ev(&mut self, index: u8, ev_index: u8, value: u8) -> TableResult<()> {
        self.primary(index)?;
        if ev_index as usize >= self.config.evs_per_event {
            return Err(TableError::InvalidEvIndex(ev_index));
        }

        let width = self.config.row_width;
        let mut row = index;
        let mut offset = ev_index as usize;
        while offset >= width {
            offset -= width;
            row = match self.find_event_continuation(row) {
                Some(next) => next,
                None => self.extend_chain(row)?,
            };
        }

        let record = &mut self.records[row as usize];
        record.evs[offset] = value;
        record.flags.raise_evs_used(offset as u8 + 1);
        Ok(())
    }

    /// Read one event-variable byte. [`TableError::NoEv`] if the index is
    /// inside the budget but beyond what has been written.
    pub fn get_ev(&self, index: u8, ev_index: u8) -> TableResult<u8> {
        self.primary(index)?;
        if ev_index as usize >= self.config.evs_per_event {
            return Err(TableError::InvalidEvIndex(ev_index));
        }

        let width = self.config.row_width;
        let mut row = index;
        let mut offset = ev_index as usize;
        while offset >= width {
            offset -= width;
            row = self
                .find_event_continuation(row)
                .ok_or(TableError::NoEv(ev_index))?;
        }
        let record = &self.records[row as usize];
        if offset >= record.flags.evs_used() as usize {
            return Err(TableError::NoEv(ev_index));
        }
        Ok(record.evs[offset])
    }

    /// All event variables of an event in write order, transparently
    /// traversing continuation rows. Positions never written within the
    /// extent read back as [`EV_FILL`].
    pub fn get_evs(&self, index: u8) -> TableResult<Vec<u8>> {
        self.primary(index)?;
        let width = self.config.row_width;
        let mut evs = Vec::new();
        let mut row = Some(index);
        while let Some(i) = row {
            let record = &self.records[i as usize];
            let next = self.find_event_continuation(i);
            let used = if next.is_some() {
                width
            } else {
                record.flags.evs_used() as usize
            };
            evs.extend_from_slice(&record.evs[..used]);
            row = next;
        }
        Ok(evs)
    }

    /// Number of event variables stored for an event: full rows times the
    /// row width, plus the last row's occupancy.
    pub fn num_ev(&self, index: u8) -> TableResult<u8> {
        Ok(self.get_evs(index)?.len() as u8)
    }

    /// Wipe the table to the empty state: every slot free, every bucket
    /// head and chain pointer at the sentinel.
    pub fn clear_all(&mut self) {
        for record in &mut self.records {
            record.release();
        }
        self.index.clear();
        debug!("clear_all: table wiped");
    }

    // ---------------- index maintenance ----------------

    /// Rebuild the hash index from the record array. Idempotent; record
    /// contents are never touched.
    pub fn rebuild(&mut self) -> TableResult<()> {
        self.index.rebuild(&self.records)
    }

    /// Rebuild, releasing any record the consistency scan flags, wiping
    /// the whole table as the last resort. The table is consistent on
    /// return; this never fails and never panics.
    pub fn recover(&mut self) {
        for _ in 0..=self.records.len() {
            match self.index.rebuild(&self.records) {
                Ok(()) => return,
                Err(TableError::CorruptTable(bad)) => {
                    warn!("recover: releasing corrupt record {bad}");
                    self.records[bad as usize].release();
                }
                Err(_) => break,
            }
        }
        warn!("recover: still inconsistent, wiping table");
        self.clear_all();
    }

    // ---------------- internals ----------------

    fn primary(&self, index: u8) -> TableResult<&EventRecord> {
        self.records
            .get(index as usize)
            .filter(|r| r.is_primary())
            .ok_or(TableError::RecordNotFound(index))
    }

    /// First free slot in the arena. The free list is implicit: any slot
    /// with the free flag set may be reused.
    fn first_free(&self) -> Option<u8> {
        self.records
            .iter()
            .position(|r| r.flags.is_free())
            .map(|i| i as u8)
    }

    /// Allocate a continuation row and hang it off `prev`. The new row is
    /// fully initialised before `prev` is pointed at it.
    fn extend_chain(&mut self, prev: u8) -> TableResult<u8> {
        let next = self.first_free().ok_or(TableError::TableFull)?;

        let record = &mut self.records[next as usize];
        record.key = EventKey::new(0xFFFF, 0xFFFF); // not used on continuations
        record.link = NO_INDEX;
        record.evs.fill(EV_FILL);
        record.flags = RecordFlags::continuation();

        self.records[prev as usize].link = next;
        self.records[prev as usize].flags.set_continued(true);
        self.index.link_continuation(&self.records, prev, next);
        debug!("extend_chain: slot {next} continues {prev}");
        Ok(next)
    }
}
