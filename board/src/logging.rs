//! Diagnostics for the board engine.
//!
//! The engine reports through two channels that never mix:
//!
//! - **Tracing (this module)**: move lifecycle for developers. `debug` covers
//!   ignored, reordered, published and committed moves; `warn` covers
//!   rejected persists and their rollback; `info` covers board mounts. Goes
//!   to stderr and is filtered by `RUST_LOG`.
//!
//! - **Error sink (`reconcile::ErrorSink`)**: the one-line notice a user
//!   sees when a move was reverted. Always delivered, whatever `RUST_LOG`
//!   says.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber used by the `board` CLI.
///
/// Filter comes from `RUST_LOG`, defaulting to `warn` so rollbacks show and
/// routine moves stay quiet.
///
/// # Example
/// ```bash
/// RUST_LOG=board::reconcile=debug board move card1 active
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
