//! calmcycle.input.v1 schema
//!
//! The JSON document accepted at the engine boundary (CLI, FFI, snapshot API):
//! marked days or stored cycle records, the event log and the daily log book,
//! plus an optional pinned "today".

mod input;
mod validation;

pub use input::*;
pub use validation::*;
