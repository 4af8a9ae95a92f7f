//! Kanban board reconciliation engine.
//!
//! This crate keeps an in-memory column/card board consistent while cards are
//! dragged between columns and each move is persisted to a remote store that
//! may reject it. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (move transition, invariants, drag
//!   session, collision). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (store adapter, config, scaffolding).
//!   Isolated behind traits to enable scripted stores in tests.
//!
//! [`state`] owns the published board and [`reconcile`] applies moves to it
//! optimistically, rolling back when persistence fails. [`commands`] wires
//! these together for the CLI.

pub mod commands;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod reconcile;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
