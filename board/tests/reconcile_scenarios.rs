//! End-to-end reconciliation scenarios.
//!
//! These tests drive the drag session and coordinator together against
//! scripted stores: optimistic publish, commit, rollback, overlapping moves and
//! a full board replacement racing an in-flight move.

use std::collections::HashMap;
use std::sync::Arc;

use board::core::drag::DragSession;
use board::core::drag_ref::DragRef;
use board::core::invariants::validate_invariants;
use board::core::types::{Board, BoardKind, MoveRequest};
use board::reconcile::{Coordinator, MoveOutcome, PendingMove, Submission};
use board::state::BoardState;
use board::test_support::{GatedStore, RecordingSink, ScriptedStore, board_with, card_ids};

fn persisting(submission: Submission) -> PendingMove {
    match submission {
        Submission::Persisting(pending) => pending,
        other => panic!("expected persisting submission, got {:?}", other),
    }
}

type Gated = (
    Coordinator<GatedStore>,
    Arc<GatedStore>,
    Arc<RecordingSink>,
);

fn gated(board: &Board) -> Gated {
    let store = Arc::new(GatedStore::new(board.clone()));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = Coordinator::new(
        BoardState::new(board.clone()),
        Arc::clone(&store),
        sink.clone(),
    );
    (coordinator, store, sink)
}

/// Scenario A: cross-column move with no index appends to the destination.
#[tokio::test]
async fn scenario_a_move_to_empty_column() {
    let board = board_with(BoardKind::BrandsCrm, &[("new", &["card1", "card2"])]);
    let store = Arc::new(ScriptedStore::new(board.clone()));
    let sink = Arc::new(RecordingSink::default());
    let coordinator =
        Coordinator::new(BoardState::new(board), Arc::clone(&store), sink.clone());

    let pending = persisting(coordinator.submit(MoveRequest::new("card1", "new", "active")));
    assert_eq!(pending.settled().await.expect("settled"), MoveOutcome::Committed);

    let current = coordinator.state().current();
    assert_eq!(card_ids(&current, "new"), vec!["card2"]);
    assert_eq!(card_ids(&current, "active"), vec!["card1"]);
    assert!(sink.messages().is_empty());
}

/// Scenario B: reorder within a column.
#[tokio::test]
async fn scenario_b_reorder_to_front() {
    let board = board_with(BoardKind::BrandsCrm, &[("new", &["card1", "card2", "card3"])]);
    let store = Arc::new(ScriptedStore::new(board.clone()));
    let coordinator = Coordinator::new(
        BoardState::new(board),
        Arc::clone(&store),
        Arc::new(RecordingSink::default()),
    );

    let mut session = DragSession::default();
    let current = coordinator.state().current();
    assert!(session.drag_start(&current, &DragRef::card("new", "card3")));
    let request = session
        .drag_end(&current, Some(&DragRef::card("new", "card1")))
        .expect("request");

    assert!(matches!(coordinator.submit(request), Submission::Reordered));
    assert_eq!(
        card_ids(&coordinator.state().current(), "new"),
        vec!["card3", "card1", "card2"]
    );
}

/// Scenario C: rejected persistence restores the exact prior board and
/// notifies once.
#[tokio::test]
async fn scenario_c_rejection_rolls_back_exactly() {
    let before = board_with(BoardKind::BrandsCrm, &[("new", &["card1", "card2"])]);
    let (coordinator, store, sink) = gated(&before);
    let mut rx = coordinator.state().subscribe();

    let pending = persisting(coordinator.submit(MoveRequest::new("card1", "new", "active")));
    // Visible before the store has answered.
    assert!(rx.has_changed().expect("sender alive"));
    assert_eq!(card_ids(&rx.borrow_and_update(), "active"), vec!["card1"]);

    store.wait_for_pending(1).await;
    store.resolve("card1", Err("permission denied".to_string()));
    assert_eq!(pending.settled().await.expect("settled"), MoveOutcome::RolledBack);

    assert_eq!(coordinator.state().current(), before);
    assert_eq!(*rx.borrow_and_update(), before);
    assert_eq!(sink.messages().len(), 1);
    assert_eq!(
        sink.messages()[0],
        "Could not move card1 name to Active; the change was reverted."
    );
}

/// Scenario D: releasing outside any target emits nothing and calls nothing.
#[tokio::test]
async fn scenario_d_drop_without_target() {
    let board = board_with(BoardKind::BrandsCrm, &[("new", &["card1"])]);
    let store = Arc::new(ScriptedStore::new(board.clone()));
    let coordinator = Coordinator::new(
        BoardState::new(board.clone()),
        Arc::clone(&store),
        Arc::new(RecordingSink::default()),
    );

    let mut session = DragSession::default();
    assert!(session.drag_start(&board, &DragRef::card("new", "card1")));
    session.drag_over(Some(DragRef::column("active")));
    let request = session.drag_end(&coordinator.state().current(), None);

    assert_eq!(request, None);
    assert_eq!(coordinator.state().current(), board);
    assert!(store.calls().is_empty());
}

/// A failure of one move only undoes that move, not a concurrent one.
#[tokio::test]
async fn overlapping_moves_roll_back_independently() {
    let board = board_with(BoardKind::BrandsCrm, &[("new", &["card1", "card2"])]);
    let (coordinator, store, sink) = gated(&board);

    let first = persisting(coordinator.submit(MoveRequest::new("card1", "new", "active")));
    let second = persisting(coordinator.submit(MoveRequest::new("card2", "new", "churned")));
    store.wait_for_pending(2).await;

    store.resolve("card1", Err("offline".to_string()));
    assert_eq!(first.settled().await.expect("settled"), MoveOutcome::RolledBack);
    store.resolve("card2", Ok(()));
    assert_eq!(second.settled().await.expect("settled"), MoveOutcome::Committed);

    let current = coordinator.state().current();
    assert_eq!(card_ids(&current, "new"), vec!["card1"]);
    assert_eq!(card_ids(&current, "active"), Vec::<&str>::new());
    assert_eq!(card_ids(&current, "churned"), vec!["card2"]);
    assert_eq!(sink.messages().len(), 1);
}

/// A second drag of the same card builds on the first, still-pending move.
#[tokio::test]
async fn rapid_moves_of_same_card_are_not_lost() {
    let board = board_with(BoardKind::BrandsCrm, &[("new", &["card1"])]);
    let (coordinator, store, _sink) = gated(&board);

    let first = persisting(coordinator.submit(MoveRequest::new("card1", "new", "in_progress")));
    let second = persisting(
        coordinator.submit(MoveRequest::new("card1", "in_progress", "active")),
    );
    assert_eq!(card_ids(&coordinator.state().current(), "active"), vec!["card1"]);

    store.wait_for_pending(2).await;
    store.resolve("card1", Ok(()));
    store.resolve("card1", Ok(()));
    assert_eq!(first.settled().await.expect("settled"), MoveOutcome::Committed);
    assert_eq!(second.settled().await.expect("settled"), MoveOutcome::Committed);
    assert_eq!(card_ids(&coordinator.state().current(), "active"), vec!["card1"]);
}

/// An earlier move failing late leaves the card where the later, accepted
/// move put it.
#[tokio::test]
async fn earlier_failure_does_not_undo_later_move() {
    let board = board_with(BoardKind::BrandsCrm, &[("new", &["card1"])]);
    let (coordinator, store, sink) = gated(&board);

    let first = persisting(coordinator.submit(MoveRequest::new("card1", "new", "in_progress")));
    let second = persisting(
        coordinator.submit(MoveRequest::new("card1", "in_progress", "active")),
    );
    store.wait_for_pending(2).await;

    store.resolve("card1", Err("offline".to_string()));
    assert_eq!(first.settled().await.expect("settled"), MoveOutcome::RolledBack);
    store.resolve("card1", Ok(()));
    assert_eq!(second.settled().await.expect("settled"), MoveOutcome::Committed);

    let current = coordinator.state().current();
    assert_eq!(card_ids(&current, "active"), vec!["card1"]);
    assert_eq!(card_ids(&current, "new"), Vec::<&str>::new());
    assert_eq!(card_ids(&current, "in_progress"), Vec::<&str>::new());
    assert_eq!(sink.messages().len(), 1);
}

/// When both moves of a card fail, the card returns to the last column the
/// store accepted, not to the intermediate one.
#[tokio::test]
async fn chained_failures_return_card_to_accepted_column() {
    let board = board_with(
        BoardKind::BrandsCrm,
        &[("new", &["card2", "card1"]), ("active", &["card3"])],
    );
    let (coordinator, store, sink) = gated(&board);

    let first = persisting(coordinator.submit(MoveRequest::new("card1", "new", "in_progress")));
    let second = persisting(
        coordinator.submit(MoveRequest::new("card1", "in_progress", "active")),
    );
    store.wait_for_pending(2).await;

    store.resolve("card1", Err("offline".to_string()));
    assert_eq!(first.settled().await.expect("settled"), MoveOutcome::RolledBack);
    assert_eq!(card_ids(&coordinator.state().current(), "active"), vec!["card3", "card1"]);

    store.resolve("card1", Err("offline".to_string()));
    assert_eq!(second.settled().await.expect("settled"), MoveOutcome::RolledBack);

    assert_eq!(coordinator.state().current(), board);
    assert_eq!(sink.messages().len(), 2);
}

/// A later move failing after the earlier one committed returns the card to
/// the committed column.
#[tokio::test]
async fn later_failure_returns_card_to_committed_column() {
    let board = board_with(BoardKind::Invites, &[("pending", &["i1"])]);
    let (coordinator, store, _sink) = gated(&board);

    let first = persisting(coordinator.submit(MoveRequest::new("i1", "pending", "invited")));
    let second = persisting(coordinator.submit(MoveRequest::new("i1", "invited", "accepted")));
    store.wait_for_pending(2).await;

    store.resolve("i1", Ok(()));
    store.resolve("i1", Err("declined by policy".to_string()));
    assert_eq!(first.settled().await.expect("settled"), MoveOutcome::Committed);
    assert_eq!(second.settled().await.expect("settled"), MoveOutcome::RolledBack);

    let current = coordinator.state().current();
    assert_eq!(card_ids(&current, "invited"), vec!["i1"]);
    assert_eq!(card_ids(&current, "accepted"), Vec::<&str>::new());
}

/// A reload that lands mid-flight is kept; rollback restores the card by id.
#[tokio::test]
async fn rollback_after_replacement_restores_card_by_id() {
    let board = board_with(
        BoardKind::BrandsCrm,
        &[("new", &["card1", "card2"]), ("active", &["card3"])],
    );
    let (coordinator, store, sink) = gated(&board);

    let pending = persisting(coordinator.submit(MoveRequest::new("card1", "new", "churned")));
    store.wait_for_pending(1).await;

    // Snapshot from elsewhere: card1 still pending in churned, a new lead
    // arrived in `new`, and card3 was moved by another admin.
    let replaced = board_with(
        BoardKind::BrandsCrm,
        &[
            ("new", &["card4", "card2"]),
            ("in_progress", &["card3"]),
            ("churned", &["card1"]),
        ],
    );
    assert!(coordinator.state().replace(replaced));

    store.resolve("card1", Err("offline".to_string()));
    assert_eq!(pending.settled().await.expect("settled"), MoveOutcome::RolledBack);

    let current = coordinator.state().current();
    assert_eq!(card_ids(&current, "new"), vec!["card1", "card4", "card2"]);
    assert_eq!(card_ids(&current, "in_progress"), vec!["card3"]);
    assert_eq!(card_ids(&current, "churned"), Vec::<&str>::new());
    assert_eq!(current.card_count(), 4);
    assert_eq!(sink.messages().len(), 1);
}

/// Cards are conserved and singly owned across any mix of commits and rollbacks.
#[tokio::test]
async fn single_ownership_holds_across_mixed_outcomes() {
    let board = board_with(
        BoardKind::Invites,
        &[("pending", &["i1", "i2", "i3"]), ("invited", &["i4"])],
    );
    let (coordinator, store, _sink) = gated(&board);
    let moves = [
        ("i1", "pending", "invited"),
        ("i2", "pending", "accepted"),
        ("i4", "invited", "declined"),
        ("i3", "pending", "accepted"),
    ];

    let mut handles = HashMap::new();
    for (card, from, to) in moves {
        let pending = persisting(coordinator.submit(MoveRequest::new(card, from, to)));
        handles.insert(card, pending);
    }
    store.wait_for_pending(moves.len()).await;

    let results = [
        ("i2", Err("validation".to_string())),
        ("i1", Ok(())),
        ("i3", Err("network".to_string())),
        ("i4", Ok(())),
    ];
    for (card, result) in results {
        store.resolve(card, result);
        let pending = handles.remove(card).expect("handle");
        pending.settled().await.expect("settled");
        let current = coordinator.state().current();
        assert_eq!(current.card_count(), 4);
        assert!(validate_invariants(&current).is_empty());
    }

    // Each rollback reinserts at the index its own snapshot recorded.
    let current = coordinator.state().current();
    assert_eq!(card_ids(&current, "pending"), vec!["i3", "i2"]);
    assert_eq!(card_ids(&current, "accepted"), Vec::<&str>::new());
    assert_eq!(card_ids(&current, "invited"), vec!["i1"]);
    assert_eq!(card_ids(&current, "declined"), vec!["i4"]);
}
