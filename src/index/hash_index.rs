//! Hash index over the record arena: bucket heads plus a chain table.
//!
//! The index is derived state: it is never persisted and can always be
//! rebuilt from the record array alone. Bucket heads map a hashed
//! (NN, EN) key to the first primary record of the bucket's collision
//! chain. The chain table is parallel to the record array; `chain[i]` is
//! the next primary in `i`'s collision chain when slot `i` holds a
//! primary, the next continuation row of the same event when it holds a
//! continuation, and [`NO_INDEX`] otherwise.

use log::warn;

use crate::types::{EventKey, EventRecord, TableError, TableResult, NO_INDEX};

/// Hash a key to a bucket.
///
/// XOR-fold each 16-bit half to a byte, then mix with a small odd
/// multiplier. Hashing the node number alone would put every short event
/// in one bucket; hashing the event number alone clusters the small event
/// numbers most layouts use. The fold of both spreads either population.
pub fn bucket_hash(key: EventKey, buckets: usize) -> usize {
    let nn_fold = (key.nn ^ (key.nn >> 8)) as u8;
    let en_fold = (key.en ^ (key.en >> 8)) as u8;
    let hash = nn_fold.wrapping_mul(7).wrapping_add(en_fold);
    hash as usize % buckets
}

/// Bucket heads plus the per-record chain table.
#[derive(Debug, Clone)]
pub struct HashIndex {
    /// First primary of each bucket's collision chain.
    heads: Vec<u8>,
    /// Per-record next links (collision or continuation, see module doc).
    chain: Vec<u8>,
}

impl HashIndex {
    /// Create an empty index with the given bucket count and arena capacity.
    pub fn new(buckets: usize, capacity: usize) -> Self {
        Self {
            heads: vec![NO_INDEX; buckets],
            chain: vec![NO_INDEX; capacity],
        }
    }

    /// The bucket a key hashes to.
    pub fn bucket_of(&self, key: EventKey) -> usize {
        bucket_hash(key, self.heads.len())
    }

    /// Find the primary record holding `key`, walking the bucket chain and
    /// comparing keys against primary records only.
    pub fn find(&self, records: &[EventRecord], key: EventKey) -> Option<u8> {
        let mut index = self.heads[self.bucket_of(key)];
        while index != NO_INDEX {
            let record = &records[index as usize];
            if record.is_primary() && record.key == key {
                return Some(index);
            }
            index = self.chain[index as usize];
        }
        None
    }

    /// One step along the continuation chain of a primary or continuation
    /// record. Returns `None` at the end of the chain.
    ///
    /// A primary's chain slot holds its collision link, so its first
    /// continuation comes from the record's persisted `link` field; from
    /// there on the chain table carries the continuation links.
    pub fn continuation_of(&self, records: &[EventRecord], index: u8) -> Option<u8> {
        let record = &records[index as usize];
        let next = if record.flags.is_continuation() {
            self.chain[index as usize]
        } else {
            record.link
        };
        (next != NO_INDEX).then_some(next)
    }

    /// Link a fully written primary at the head of its bucket chain.
    ///
    /// Insertion policy is prepend: O(1), and chain order carries no
    /// meaning, only reachability does. The record's fields must already
    /// be written; this is the step that makes it observable.
    pub fn link_primary(&mut self, key: EventKey, index: u8) {
        let bucket = self.bucket_of(key);
        self.chain[index as usize] = self.heads[bucket];
        self.heads[bucket] = index;
    }

    /// Unlink a primary from its bucket chain, patching the predecessor's
    /// chain entry or the bucket head. The slot must not be marked free
    /// until after this returns.
    pub fn unlink_primary(&mut self, key: EventKey, index: u8) -> TableResult<()> {
        let bucket = self.bucket_of(key);
        let mut cursor = self.heads[bucket];
        if cursor == index {
            self.heads[bucket] = self.chain[index as usize];
            self.chain[index as usize] = NO_INDEX;
            return Ok(());
        }
        while cursor != NO_INDEX {
            let next = self.chain[cursor as usize];
            if next == index {
                self.chain[cursor as usize] = self.chain[index as usize];
                self.chain[index as usize] = NO_INDEX;
                return Ok(());
            }
            cursor = next;
        }
        // Not reachable from its own bucket: the reachability invariant
        // is broken.
        Err(TableError::CorruptTable(index))
    }

    /// Record a continuation link in the chain table. `prev` is the row
    /// being extended; when it is itself a continuation its chain slot is
    /// the continuation link (a primary's chain slot belongs to the
    /// collision chain and is left alone).
    pub fn link_continuation(&mut self, records: &[EventRecord], prev: u8, next: u8) {
        self.chain[next as usize] = NO_INDEX;
        if records[prev as usize].flags.is_continuation() {
            self.chain[prev as usize] = next;
        }
    }

    /// Reset every bucket head and chain entry to the sentinel.
    pub fn clear(&mut self) {
        self.heads.fill(NO_INDEX);
        self.chain.fill(NO_INDEX);
    }

    /// Rebuild the whole index from the record array.
    ///
    /// Clears every head and chain entry, then re-derives bucket
    /// membership from stored keys and continuation links from stored
    /// record `link` fields in one linear scan. Record contents are never
    /// modified, and running the rebuild twice yields identical state.
    ///
    /// The scan doubles as the consistency check: a continuation link that
    /// points out of range, at a free or non-continuation slot, or back
    /// into a chain already walked, and any continuation row no primary
    /// claims, fail with [`TableError::CorruptTable`] naming the offending
    /// slot. The index is left cleared of the partial rebuild's chains in
    /// that case only to the extent that matters: callers recover by
    /// releasing the named slot and rebuilding again.
    pub fn rebuild(&mut self, records: &[EventRecord]) -> TableResult<()> {
        self.clear();

        let mut claimed = vec![false; records.len()];

        for (i, record) in records.iter().enumerate() {
            if !record.is_primary() {
                continue;
            }
            self.link_primary(record.key, i as u8);

            // Mirror this event's continuation chain into the chain table.
            let mut prev = i;
            let mut next = record.link;
            let mut steps = 0usize;
            while next != NO_INDEX {
                if (next as usize) >= records.len() || steps >= records.len() {
                    warn!("record {prev}: continuation link {next} out of range or cyclic");
                    return Err(TableError::CorruptTable(prev as u8));
                }
                let target = &records[next as usize];
                if target.flags.is_free() || !target.flags.is_continuation() || claimed[next as usize]
                {
                    warn!("record {prev}: continuation link {next} targets an invalid slot");
                    return Err(TableError::CorruptTable(prev as u8));
                }
                claimed[next as usize] = true;
                if records[prev].flags.is_continuation() {
                    self.chain[prev] = next;
                }
                prev = next as usize;
                next = target.link;
                steps += 1;
            }
        }

        // Every non-free slot must be reachable: a continuation row no
        // primary claims is corrupt.
        for (i, record) in records.iter().enumerate() {
            if !record.flags.is_free() && record.flags.is_continuation() && !claimed[i] {
                warn!("record {i}: orphaned continuation row");
                return Err(TableError::CorruptTable(i as u8));
            }
        }

        Ok(())
    }
}
