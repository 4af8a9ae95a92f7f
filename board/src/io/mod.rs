//! I/O helpers for board commands.

pub mod config;
pub mod init;
pub mod store;
