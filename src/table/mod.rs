//! The record arena: fixed-capacity event storage with an embedded hash index.

pub mod store;

pub use store::EventTable;
