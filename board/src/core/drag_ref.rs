//! Typed form of the identifiers exchanged with the drag surface.
//!
//! The UI addresses droppables as `columnId` and draggable cards as
//! `columnId:cardId`. Raw strings are parsed here once; the rest of the engine
//! only sees [`DragRef`].

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::types::{CardId, ColumnId};

const SEPARATOR: char = ':';

/// A drag source or drop target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DragRef {
    /// A whole column (drop on the column body).
    Column(ColumnId),
    /// A card rendered inside `column`.
    Card { column: ColumnId, card: CardId },
}

impl DragRef {
    pub fn card(column: impl Into<ColumnId>, card: impl Into<CardId>) -> Self {
        DragRef::Card {
            column: column.into(),
            card: card.into(),
        }
    }

    pub fn column(column: impl Into<ColumnId>) -> Self {
        DragRef::Column(column.into())
    }

    /// Parse `columnId` or `columnId:cardId`.
    ///
    /// Only the first separator splits, so card ids may themselves contain `:`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match raw.split_once(SEPARATOR) {
            None if raw.is_empty() => Err(anyhow!("empty drag ref")),
            None => Ok(DragRef::Column(ColumnId::new(raw))),
            Some((column, card)) => {
                if column.is_empty() || card.is_empty() {
                    return Err(anyhow!("malformed drag ref '{}'", raw));
                }
                Ok(DragRef::card(column, card))
            }
        }
    }

    /// Column addressed by this ref.
    pub fn column_id(&self) -> &ColumnId {
        match self {
            DragRef::Column(column) => column,
            DragRef::Card { column, .. } => column,
        }
    }
}

impl fmt::Display for DragRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DragRef::Column(column) => write!(f, "{}", column),
            DragRef::Card { column, card } => write!(f, "{}{}{}", column, SEPARATOR, card),
        }
    }
}

impl FromStr for DragRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        DragRef::parse(s)
    }
}

impl Serialize for DragRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DragRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DragRef::parse(&raw).map_err(serde::de::Error::custom)
    }
}
