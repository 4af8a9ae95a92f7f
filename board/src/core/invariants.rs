//! Semantic board invariants not expressible via JSON Schema.

use std::collections::HashSet;

use crate::core::types::Board;

/// Check semantic invariants:
/// - Columns match the board kind's stages, in order
/// - No duplicate column ids
/// - Every card id appears in exactly one column
/// - Each card's `status` names the column that holds it
pub fn validate_invariants(board: &Board) -> Vec<String> {
    let mut errors = Vec::new();

    let expected: Vec<&str> = board.kind.stages().iter().map(|(id, _)| *id).collect();
    let actual: Vec<&str> = board.columns.iter().map(|c| c.id.as_str()).collect();
    if expected != actual {
        errors.push(format!(
            "columns [{}] do not match {} stages [{}]",
            actual.join(", "),
            board.kind.label(),
            expected.join(", ")
        ));
    }

    let mut column_ids = HashSet::new();
    for column in &board.columns {
        if !column_ids.insert(column.id.as_str()) {
            errors.push(format!("duplicate column id '{}'", column.id));
        }
    }

    let mut seen = HashSet::new();
    for column in &board.columns {
        for card in &column.cards {
            if !seen.insert(card.id.as_str()) {
                errors.push(format!(
                    "duplicate card id '{}' in column '{}'",
                    card.id, column.id
                ));
            }
            if card.status != column.id {
                errors.push(format!(
                    "{}/{}: status '{}' does not match column",
                    column.id, card.id, card.status
                ));
            }
        }
    }

    errors
}
