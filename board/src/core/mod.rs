//! Deterministic, pure logic of the board engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! boards and return deterministic outputs suitable for tests.

pub mod collision;
pub mod drag;
pub mod drag_ref;
pub mod invariants;
pub mod transition;
pub mod types;
