//! The teach protocol: bus opcodes mapped onto table operations.

pub mod dispatch;
pub mod teach;

pub use dispatch::{CmdErr, Opcode, Response};
pub use teach::{Mode, TeachEngine};
