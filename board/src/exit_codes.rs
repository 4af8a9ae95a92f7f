//! Stable exit codes for board CLI commands.

/// Command succeeded; for `move`/`drop`, the store accepted the move.
pub const OK: i32 = 0;
/// Command failed due to invalid layout/config/board or other errors.
pub const INVALID: i32 = 1;
/// `move`/`drop` produced no change (stale card, no drop target, same slot).
pub const UNCHANGED: i32 = 2;
/// The store rejected the move and the board was rolled back.
pub const REJECTED: i32 = 3;
