//! Drag session state machine.
//!
//! Turns a continuous pointer interaction into at most one [`MoveRequest`].
//! Nothing is committed while hovering; the request is computed on drop from
//! the board as it is at that moment.

use crate::core::collision::{ActivationConstraint, Droppable, Point, pointer_within};
use crate::core::drag_ref::DragRef;
use crate::core::types::{Board, Card, CardId, ColumnId, MoveRequest};

/// Lifecycle phase of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum DragPhase {
    Idle,
    /// Pointer is down on a card but has not travelled the activation distance.
    Pending { source: DragRef, origin: Point },
    Dragging {
        column: ColumnId,
        card: CardId,
        /// Snapshot of the dragged card for overlay rendering.
        active: Card,
        over: Option<DragRef>,
    },
}

#[derive(Debug, Clone)]
pub struct DragSession {
    phase: DragPhase,
    activation: ActivationConstraint,
}

impl Default for DragSession {
    fn default() -> Self {
        Self::new(ActivationConstraint::default())
    }
}

impl DragSession {
    pub fn new(activation: ActivationConstraint) -> Self {
        Self {
            phase: DragPhase::Idle,
            activation,
        }
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }

    /// Card shown in the drag overlay, if a drag is live.
    pub fn active_card(&self) -> Option<&Card> {
        match &self.phase {
            DragPhase::Dragging { active, .. } => Some(active),
            _ => None,
        }
    }

    /// Current hover target, if a drag is live.
    pub fn over(&self) -> Option<&DragRef> {
        match &self.phase {
            DragPhase::Dragging { over, .. } => over.as_ref(),
            _ => None,
        }
    }

    /// Enter `Dragging` for the card addressed by `source`.
    ///
    /// Returns false (and stays idle) when `source` is a column ref or the
    /// card is not in the referenced column of `board`.
    pub fn drag_start(&mut self, board: &Board, source: &DragRef) -> bool {
        let DragRef::Card { column, card } = source else {
            self.phase = DragPhase::Idle;
            return false;
        };
        let active = board
            .column(column)
            .and_then(|col| col.position(card).map(|pos| col.cards[pos].clone()));
        match active {
            Some(active) => {
                self.phase = DragPhase::Dragging {
                    column: column.clone(),
                    card: card.clone(),
                    active,
                    over: None,
                };
                true
            }
            None => {
                self.phase = DragPhase::Idle;
                false
            }
        }
    }

    /// Record the hover target. Ignored unless dragging.
    pub fn drag_over(&mut self, target: Option<DragRef>) {
        if let DragPhase::Dragging { over, .. } = &mut self.phase {
            *over = target;
        }
    }

    /// Finish the drag and compute the move, returning to `Idle` either way.
    ///
    /// - Column target: append to that column.
    /// - Card target: insert before that card's current index.
    /// - No target, or a target that no longer exists on `board`: no move.
    pub fn drag_end(&mut self, board: &Board, target: Option<&DragRef>) -> Option<MoveRequest> {
        let phase = std::mem::replace(&mut self.phase, DragPhase::Idle);
        let DragPhase::Dragging { column, card, .. } = phase else {
            return None;
        };
        let target = target?;

        let to_column = board.column(target.column_id())?;
        let to_index = match target {
            DragRef::Column(_) => None,
            DragRef::Card { card: over, .. } => Some(to_column.position(over)?),
        };

        Some(MoveRequest {
            card,
            from: column,
            to: to_column.id.clone(),
            to_index,
        })
    }

    /// Abort without emitting a move.
    pub fn drag_cancel(&mut self) {
        self.phase = DragPhase::Idle;
    }

    /// Pointer pressed on `source`. Only card refs can start a drag.
    pub fn pointer_down(&mut self, source: DragRef, at: Point) {
        self.phase = match source {
            DragRef::Card { .. } => DragPhase::Pending { source, origin: at },
            DragRef::Column(_) => DragPhase::Idle,
        };
    }

    /// Pointer moved. Activates a pending press once it has travelled far
    /// enough, then tracks the hover target under the pointer.
    pub fn pointer_move(&mut self, board: &Board, at: Point, droppables: &[Droppable]) {
        if let DragPhase::Pending { source, origin } = &self.phase {
            if !self.activation.is_met(*origin, at) {
                return;
            }
            let source = source.clone();
            if !self.drag_start(board, &source) {
                return;
            }
        }
        let over = pointer_within(at, droppables).map(|hit| hit.id.clone());
        self.drag_over(over);
    }

    /// Pointer released. A press that never activated is a click and emits
    /// nothing; otherwise the drop target is the droppable under the pointer.
    pub fn pointer_up(
        &mut self,
        board: &Board,
        at: Point,
        droppables: &[Droppable],
    ) -> Option<MoveRequest> {
        if !self.is_dragging() {
            self.phase = DragPhase::Idle;
            return None;
        }
        let target = pointer_within(at, droppables).map(|hit| hit.id.clone());
        self.drag_end(board, target.as_ref())
    }
}
