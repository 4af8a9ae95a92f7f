//! Owned board container shared by the drag surface and the coordinator.
//!
//! The board is the only shared mutable value of the engine. Readers take a
//! snapshot or subscribe; writers publish whole boards. Once torn down, every
//! write is dropped so late persistence results cannot touch a dead view.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::debug;

use crate::core::types::Board;

#[derive(Clone)]
pub struct BoardState {
    tx: Arc<watch::Sender<Board>>,
    live: Arc<AtomicBool>,
}

impl BoardState {
    pub fn new(board: Board) -> Self {
        let (tx, _) = watch::channel(board);
        Self {
            tx: Arc::new(tx),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Snapshot of the latest published board.
    pub fn current(&self) -> Board {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every subsequent publish.
    pub fn subscribe(&self) -> watch::Receiver<Board> {
        self.tx.subscribe()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Stop accepting writes. Subscribers keep the last board.
    ///
    /// Taken under the channel lock, so an `update` either completes before
    /// teardown or does not run at all.
    pub fn teardown(&self) {
        self.tx.send_if_modified(|_| {
            self.live.store(false, Ordering::Release);
            false
        });
        debug!("board state torn down");
    }

    /// Publish `board` as the visible board. Returns false after teardown.
    pub fn publish(&self, board: Board) -> bool {
        self.update(|_| Some(board))
    }

    /// Swap in a board from an external reload (full replacement, no merge).
    ///
    /// Identical boards are not republished.
    pub fn replace(&self, board: Board) -> bool {
        let changed = self.update(|current| (current != &board).then_some(board));
        if changed {
            debug!("board replaced from snapshot");
        }
        changed
    }

    /// Read the latest board and publish the result of `f` in one step.
    ///
    /// `f` returns `None` to leave the board as is. After teardown `f` is not
    /// called. Returns whether a new board was published.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&Board) -> Option<Board>,
    {
        self.tx.send_if_modified(|board| {
            if !self.live.load(Ordering::Acquire) {
                return false;
            }
            match f(board) {
                Some(next) => {
                    *board = next;
                    true
                }
                None => false,
            }
        })
    }
}
