//! Shared deterministic types for the board engine.
//!
//! These types define stable contracts between core components. They carry no
//! I/O and serialize to the document layout used by the store.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable identifier of a card (a brand lead, an invite, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a column, drawn from the stage set of a [`BoardKind`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(String);

impl ColumnId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A relocatable unit on the board.
///
/// `status` mirrors the id of the owning column; it is kept in sync by the
/// transition function so consumers can filter cards without the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub status: ColumnId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, u64>,
}

/// A lifecycle bucket holding an ordered list of cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    pub cards: Vec<Card>,
}

impl Column {
    /// Index of `card` within this column, if present.
    pub fn position(&self, card: &CardId) -> Option<usize> {
        self.cards.iter().position(|c| &c.id == card)
    }
}

/// Fixed column layouts of the admin boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardKind {
    /// Brand leads moving through the sales lifecycle.
    #[default]
    BrandsCrm,
    /// Invitations sent to prospective brands and influencers.
    Invites,
}

impl BoardKind {
    /// Stage ids and titles, in display order.
    pub fn stages(self) -> &'static [(&'static str, &'static str)] {
        match self {
            BoardKind::BrandsCrm => &[
                ("new", "New"),
                ("in_progress", "In Progress"),
                ("active", "Active"),
                ("churned", "Churned"),
            ],
            BoardKind::Invites => &[
                ("pending", "Pending"),
                ("invited", "Invited"),
                ("accepted", "Accepted"),
                ("declined", "Declined"),
            ],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BoardKind::BrandsCrm => "brands_crm",
            BoardKind::Invites => "invites",
        }
    }
}

impl FromStr for BoardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brands_crm" => Ok(BoardKind::BrandsCrm),
            "invites" => Ok(BoardKind::Invites),
            other => Err(format!(
                "unknown board kind '{}' (expected brands_crm or invites)",
                other
            )),
        }
    }
}

/// Ordered columns of one board. Column membership never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub kind: BoardKind,
    pub columns: Vec<Column>,
}

impl Board {
    /// Board of `kind` with every stage present and no cards.
    pub fn empty(kind: BoardKind) -> Self {
        let columns = kind
            .stages()
            .iter()
            .map(|(id, title)| Column {
                id: ColumnId::new(*id),
                title: (*title).to_string(),
                cards: Vec::new(),
            })
            .collect();
        Self { kind, columns }
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|column| &column.id == id)
    }

    pub fn column_index(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|column| &column.id == id)
    }

    /// Locate `card` by id: `(column index, card index)`.
    pub fn locate(&self, card: &CardId) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(ci, column)| column.position(card).map(|pos| (ci, pos)))
    }

    pub fn card(&self, card: &CardId) -> Option<&Card> {
        self.locate(card)
            .map(|(ci, pos)| &self.columns[ci].cards[pos])
    }

    pub fn card_count(&self) -> usize {
        self.columns.iter().map(|column| column.cards.len()).sum()
    }
}

/// Normalized outcome of a single drag-end, or a direct move command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub card: CardId,
    pub from: ColumnId,
    pub to: ColumnId,
    /// Insertion index in `to`; `None` appends.
    #[serde(default)]
    pub to_index: Option<usize>,
}

impl MoveRequest {
    pub fn new(card: impl Into<CardId>, from: impl Into<ColumnId>, to: impl Into<ColumnId>) -> Self {
        Self {
            card: card.into(),
            from: from.into(),
            to: to.into(),
            to_index: None,
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.to_index = Some(index);
        self
    }

    pub fn is_cross_column(&self) -> bool {
        self.from != self.to
    }
}
