//! Index structures for near-constant-time event lookup.

pub mod hash_index;

pub use hash_index::{bucket_hash, HashIndex};
