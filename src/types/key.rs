//! The (node number, event number) key identifying a stored event.

use serde::Serialize;

/// Identifies a protocol event: the originating node number plus the
/// event number it raised.
///
/// Short events carry no node-number qualification; they are stored with
/// `nn == 0` so that lookup treats all short events from any producer as
/// one key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EventKey {
    /// Node number of the teaching producer (0 for short events).
    pub nn: u16,
    /// Event number within that node.
    pub en: u16,
}

impl EventKey {
    /// Create a key from node and event numbers.
    pub fn new(nn: u16, en: u16) -> Self {
        Self { nn, en }
    }

    /// Create a short-event key (node number forced to 0).
    pub fn short(en: u16) -> Self {
        Self { nn: 0, en }
    }

    /// Whether this key describes a short event.
    pub fn is_short(&self) -> bool {
        self.nn == 0
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.nn, self.en)
    }
}
