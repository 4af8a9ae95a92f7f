//! Optimistic move application with rollback on persistence failure.
//!
//! A submitted move is published to [`BoardState`] immediately, then persisted
//! in a background task. If the store rejects it, the card is put back and one
//! notification goes to the [`ErrorSink`]. Moves are never serialized behind
//! each other: each carries its own snapshot and rolls back on its own.
//!
//! Moves of the same card chain. A failed move never touches a card that a
//! later move has taken over, and a later move's rollback target skips
//! origins the store never accepted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::transition::{move_card, restore_card};
use crate::core::types::{Board, CardId, MoveRequest};
use crate::io::store::RemoteStore;
use crate::state::BoardState;

/// User-visible failure channel.
pub trait ErrorSink: Send + Sync {
    /// Deliver one human-readable line.
    fn report(&self, message: String);
}

impl ErrorSink for mpsc::UnboundedSender<String> {
    fn report(&self, message: String) {
        if self.send(message).is_err() {
            debug!("error sink closed, notification dropped");
        }
    }
}

/// What `submit` did with a move.
#[derive(Debug)]
pub enum Submission {
    /// Stale or no-op request; nothing published.
    Unchanged,
    /// Same-column reorder; published locally, nothing to persist.
    Reordered,
    /// Published and handed to the store.
    Persisting(PendingMove),
}

/// Final state of a persisted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Store accepted the move; the optimistic board stands.
    Committed,
    /// Store rejected the move; the card was put back unless a later move
    /// owns it now.
    RolledBack,
    /// Store rejected the move after the board was torn down; nothing applied.
    Detached,
}

/// Handle to an in-flight persistence call.
#[derive(Debug)]
pub struct PendingMove {
    request: MoveRequest,
    handle: JoinHandle<MoveOutcome>,
}

impl PendingMove {
    pub fn request(&self) -> &MoveRequest {
        &self.request
    }

    /// Wait for the store to resolve and the reaction to be applied.
    pub async fn settled(self) -> Result<MoveOutcome> {
        self.handle.await.context("persistence task failed")
    }
}

/// A cross-column move waiting on the store.
struct Flight {
    card: CardId,
    /// Board to restore on failure. Rebased when an earlier move of the same
    /// card fails, so it never points at an unaccepted column.
    previous: Board,
    /// Earlier still-pending move of the same card this one started from.
    prior: Option<u64>,
}

/// What closing a flight leaves for the rollback.
struct Closed {
    previous: Board,
    /// A later move of the same card has taken the card over.
    superseded: bool,
}

#[derive(Default)]
struct Ledger {
    next_seq: u64,
    flights: HashMap<u64, Flight>,
    /// Newest move per card whose outcome still decides where the card sits.
    latest: HashMap<CardId, u64>,
}

impl Ledger {
    fn open(&mut self, card: &CardId, previous: Board) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        let prior = self
            .latest
            .insert(card.clone(), seq)
            .filter(|prior| self.flights.contains_key(prior));
        self.flights.insert(
            seq,
            Flight {
                card: card.clone(),
                previous,
                prior,
            },
        );
        seq
    }

    fn close(&mut self, seq: u64, committed: bool) -> Option<Closed> {
        let flight = self.flights.remove(&seq)?;
        let superseded = self.latest.get(&flight.card) != Some(&seq);
        if !superseded {
            // A failure hands the card back to the move it started from.
            match flight.prior.filter(|_| !committed) {
                Some(prior) => self.latest.insert(flight.card.clone(), prior),
                None => self.latest.remove(&flight.card),
            };
        }

        for next in self.flights.values_mut() {
            if next.prior != Some(seq) {
                continue;
            }
            if committed {
                next.prior = None;
            } else {
                next.previous = restore_card(&next.previous, &flight.previous, &flight.card);
                next.prior = flight.prior;
            }
        }

        Some(Closed {
            previous: flight.previous,
            superseded,
        })
    }
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Applies moves to a [`BoardState`] and reconciles them with a store.
pub struct Coordinator<S> {
    state: BoardState,
    store: Arc<S>,
    sink: Arc<dyn ErrorSink>,
    ledger: Arc<Mutex<Ledger>>,
}

impl<S: RemoteStore + 'static> Coordinator<S> {
    pub fn new(state: BoardState, store: Arc<S>, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            state,
            store,
            sink,
            ledger: Arc::new(Mutex::new(Ledger::default())),
        }
    }

    /// Load the board from `store` and build a coordinator around it.
    pub async fn mount(store: Arc<S>, sink: Arc<dyn ErrorSink>) -> Result<Self> {
        let board = store.load_board().await.context("load board at mount")?;
        info!(
            kind = board.kind.label(),
            cards = board.card_count(),
            "board mounted"
        );
        Ok(Self::new(BoardState::new(board), store, sink))
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Reload the board from the store and replace the published one.
    ///
    /// Returns whether the visible board changed.
    pub async fn reload(&self) -> Result<bool> {
        let board = self.store.load_board().await.context("reload board")?;
        Ok(self.state.replace(board))
    }

    /// Replace the published board only if another writer changed the store.
    ///
    /// The store's own writes carry column membership only, so replacing on
    /// them would discard the order of optimistic inserts.
    pub async fn refresh(&self) -> Result<bool> {
        match self
            .store
            .load_external()
            .await
            .context("refresh board")?
        {
            Some(board) => Ok(self.state.replace(board)),
            None => Ok(false),
        }
    }

    /// Apply `request` optimistically and start persisting it.
    ///
    /// The new board is published before this returns. Must be called from
    /// within a tokio runtime.
    pub fn submit(&self, request: MoveRequest) -> Submission {
        let mut ledger = lock(&self.ledger);
        let mut snapshot: Option<(Board, Board)> = None;
        self.state.update(|current| {
            let next = move_card(current, &request);
            if &next == current {
                return None;
            }
            snapshot = Some((current.clone(), next.clone()));
            Some(next)
        });

        let Some((previous, next)) = snapshot else {
            debug!(card = %request.card, from = %request.from, to = %request.to, "move ignored");
            return Submission::Unchanged;
        };

        if !request.is_cross_column() {
            debug!(card = %request.card, column = %request.to, index = ?request.to_index, "card reordered");
            return Submission::Reordered;
        }

        let seq = ledger.open(&request.card, previous);
        drop(ledger);

        debug!(card = %request.card, from = %request.from, to = %request.to, seq, "move published");
        let message = failure_message(&next, &request);
        let handle = tokio::spawn(persist(
            SettleCtx {
                state: self.state.clone(),
                ledger: Arc::clone(&self.ledger),
                sink: Arc::clone(&self.sink),
                seq,
            },
            Arc::clone(&self.store),
            request.clone(),
            next,
            message,
        ));
        Submission::Persisting(PendingMove { request, handle })
    }
}

/// Shared handles a persistence task reacts through.
struct SettleCtx {
    state: BoardState,
    ledger: Arc<Mutex<Ledger>>,
    sink: Arc<dyn ErrorSink>,
    seq: u64,
}

async fn persist<S: RemoteStore>(
    ctx: SettleCtx,
    store: Arc<S>,
    request: MoveRequest,
    next: Board,
    message: String,
) -> MoveOutcome {
    let result = store.persist_card_column(&request.card, &request.to).await;

    let mut ledger = lock(&ctx.ledger);
    let closed = ledger.close(ctx.seq, result.is_ok());
    let err = match result {
        Ok(()) => {
            debug!(card = %request.card, to = %request.to, "move committed");
            return MoveOutcome::Committed;
        }
        Err(err) => err,
    };
    let Some(closed) = closed else {
        warn!(card = %request.card, seq = ctx.seq, "move settled twice");
        return MoveOutcome::Detached;
    };

    let mut live = false;
    ctx.state.update(|current| {
        live = true;
        if closed.superseded {
            return None;
        }
        let restored = rollback(current, &closed.previous, &next, &request);
        (&restored != current).then_some(restored)
    });
    drop(ledger);

    if !live {
        debug!(card = %request.card, error = %format!("{:#}", err), "move failed after teardown");
        return MoveOutcome::Detached;
    }

    warn!(
        card = %request.card,
        to = %request.to,
        superseded = closed.superseded,
        error = %format!("{:#}", err),
        "persisting move failed, rolling back"
    );
    ctx.sink.report(message);
    MoveOutcome::RolledBack
}

/// Board to publish when `request`, which produced `next` from `previous`,
/// fails.
///
/// If nothing happened since, the exact `previous` comes back. Otherwise the
/// card is put back by id, and only while it still sits in the column this
/// move put it in; anywhere else, something newer placed it.
fn rollback(current: &Board, previous: &Board, next: &Board, request: &MoveRequest) -> Board {
    if current == next {
        return previous.clone();
    }
    let still_placed = current
        .locate(&request.card)
        .is_some_and(|(column, _)| current.columns[column].id == request.to);
    if !still_placed {
        return current.clone();
    }
    restore_card(current, previous, &request.card)
}

fn failure_message(next: &Board, request: &MoveRequest) -> String {
    let name = next
        .card(&request.card)
        .map_or_else(|| request.card.to_string(), |card| card.name.clone());
    let column = next
        .column(&request.to)
        .map_or_else(|| request.to.to_string(), |column| column.title.clone());
    format!("Could not move {} to {}; the change was reverted.", name, column)
}
