//! Board transitions: the pure move function and per-card restore.
//!
//! Both functions take the board by reference and return a new value. Callers
//! rely on the input staying intact so it can be republished on rollback.

use crate::core::types::{Board, CardId, MoveRequest};

/// Apply `request` to `board`, returning the resulting board.
///
/// Stale requests (unknown column, or card no longer in `from`) return an
/// unchanged clone. A same-column request without an index is also a no-op.
/// Indices are clamped to the destination length.
pub fn move_card(board: &Board, request: &MoveRequest) -> Board {
    let (Some(from), Some(to)) = (
        board.column_index(&request.from),
        board.column_index(&request.to),
    ) else {
        return board.clone();
    };
    let Some(position) = board.columns[from].position(&request.card) else {
        return board.clone();
    };

    if from == to {
        let Some(to_index) = request.to_index else {
            return board.clone();
        };
        let mut next = board.clone();
        let cards = &mut next.columns[from].cards;
        let card = cards.remove(position);
        let index = to_index.min(cards.len());
        cards.insert(index, card);
        return next;
    }

    let mut next = board.clone();
    let mut card = next.columns[from].cards.remove(position);
    card.status = request.to.clone();
    let dest = &mut next.columns[to].cards;
    let index = request.to_index.map_or(dest.len(), |i| i.min(dest.len()));
    dest.insert(index, card);
    next
}

/// Put `card` back where it was in `previous`, working on `current`.
///
/// The card is located by id in both boards, so structure that changed since
/// `previous` (other moves, a full reload) is left alone. Returns `current`
/// unchanged when the card is missing from either board.
pub fn restore_card(current: &Board, previous: &Board, card: &CardId) -> Board {
    let Some((prev_column, prev_index)) = previous.locate(card) else {
        return current.clone();
    };
    let Some((cur_column, _)) = current.locate(card) else {
        return current.clone();
    };
    let request = MoveRequest {
        card: card.clone(),
        from: current.columns[cur_column].id.clone(),
        to: previous.columns[prev_column].id.clone(),
        to_index: Some(prev_index),
    };
    move_card(current, &request)
}
