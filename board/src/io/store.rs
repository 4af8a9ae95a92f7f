//! Remote store adapter and its JSON-document implementation.
//!
//! The [`RemoteStore`] trait decouples the coordinator from the backend that
//! durably records which column a card belongs to. Tests use scripted stores
//! that resolve or reject on demand.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use jsonschema::validator_for;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::core::invariants::validate_invariants;
use crate::core::transition::move_card;
use crate::core::types::{Board, CardId, ColumnId, MoveRequest};

pub const BOARD_SCHEMA: &str = include_str!("../../schemas/board.v1.schema.json");

/// Backend holding the durable board.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the full board.
    async fn load_board(&self) -> Result<Board>;

    /// Record that `card` now belongs to `column`. Any error means the move
    /// was not accepted.
    async fn persist_card_column(&self, card: &CardId, column: &ColumnId) -> Result<()>;

    /// Fetch the board only if a writer other than this store changed it
    /// since this store last wrote. By default every load counts as external.
    async fn load_external(&self) -> Result<Option<Board>> {
        self.load_board().await.map(Some)
    }
}

/// Store keeping the board as one pretty-printed JSON document.
///
/// Read-modify-write cycles are serialized so concurrent persists from the
/// coordinator cannot interleave. The lock also guards the last board this
/// store wrote, which tells its own writes apart from external edits.
pub struct JsonFileStore {
    path: PathBuf,
    written: Mutex<Option<Board>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RemoteStore for JsonFileStore {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn load_board(&self) -> Result<Board> {
        let _guard = self.written.lock().await;
        read_board(&self.path).await
    }

    #[instrument(skip_all, fields(card = %card, column = %column))]
    async fn persist_card_column(&self, card: &CardId, column: &ColumnId) -> Result<()> {
        let mut written = self.written.lock().await;
        let board = read_board(&self.path).await?;
        if board.column(column).is_none() {
            return Err(anyhow!("unknown column '{}'", column));
        }
        let (from, _) = board
            .locate(card)
            .ok_or_else(|| anyhow!("card '{}' not found", card))?;
        let from = board.columns[from].id.clone();
        if &from == column {
            debug!("card already in column");
            return Ok(());
        }

        let next = move_card(&board, &MoveRequest::new(card.clone(), from, column.clone()));
        write_board(&self.path, &next).await?;
        *written = Some(next);
        debug!("card column persisted");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn load_external(&self) -> Result<Option<Board>> {
        let written = self.written.lock().await;
        let board = read_board(&self.path).await?;
        if written.as_ref() == Some(&board) {
            debug!("document unchanged since own write");
            return Ok(None);
        }
        Ok(Some(board))
    }
}

/// Load and validate a board document (schema + invariants).
pub async fn read_board(path: &Path) -> Result<Board> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read board {}", path.display()))?;
    parse_board(&contents).with_context(|| format!("load board {}", path.display()))
}

/// Atomically write a board document (temp file + rename).
pub async fn write_board(path: &Path, board: &Board) -> Result<()> {
    let buf = render_board(board)?;
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, buf)
        .await
        .with_context(|| format!("write temp board {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("replace board {}", path.display()))?;
    Ok(())
}

/// Parse board JSON, checking it against the embedded schema and invariants.
pub fn parse_board(contents: &str) -> Result<Board> {
    let value: Value = serde_json::from_str(contents).context("parse board json")?;
    validate_schema(&value)?;
    let board: Board = serde_json::from_value(value).context("deserialize board")?;
    let errors = validate_invariants(&board);
    if !errors.is_empty() {
        return Err(anyhow!("board invariants failed: {}", errors.join("; ")));
    }
    Ok(board)
}

/// Serialize a board with stable formatting and a trailing newline.
pub fn render_board(board: &Board) -> Result<String> {
    let mut buf = serde_json::to_string_pretty(board).context("serialize board")?;
    buf.push('\n');
    Ok(buf)
}

fn validate_schema(board: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(BOARD_SCHEMA).context("parse board schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(board) {
        let messages = compiled
            .iter_errors(board)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "board schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BoardKind;
    use crate::test_support::{board_with, card_ids};

    async fn store_with(board: &Board) -> (tempfile::TempDir, JsonFileStore) {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("board.json");
        write_board(&path, board).await.expect("write board");
        (temp, JsonFileStore::new(path))
    }

    #[tokio::test]
    async fn load_returns_written_board() {
        let board = board_with(BoardKind::BrandsCrm, &[("new", &["a", "b"])]);
        let (_temp, store) = store_with(&board).await;
        assert_eq!(store.load_board().await.expect("load"), board);
    }

    #[tokio::test]
    async fn persist_moves_card_and_retags_status() {
        let board = board_with(BoardKind::BrandsCrm, &[("new", &["a", "b"]), ("active", &["c"])]);
        let (_temp, store) = store_with(&board).await;

        store
            .persist_card_column(&CardId::from("a"), &ColumnId::from("active"))
            .await
            .expect("persist");

        let loaded = store.load_board().await.expect("load");
        assert_eq!(card_ids(&loaded, "new"), vec!["b"]);
        assert_eq!(card_ids(&loaded, "active"), vec!["c", "a"]);
    }

    #[tokio::test]
    async fn persist_rejects_unknown_card_or_column() {
        let board = board_with(BoardKind::BrandsCrm, &[("new", &["a"])]);
        let (_temp, store) = store_with(&board).await;

        let err = store
            .persist_card_column(&CardId::from("zzz"), &ColumnId::from("active"))
            .await
            .expect_err("unknown card");
        assert!(err.to_string().contains("zzz"));

        let err = store
            .persist_card_column(&CardId::from("a"), &ColumnId::from("archived"))
            .await
            .expect_err("unknown column");
        assert!(err.to_string().contains("archived"));
    }

    #[tokio::test]
    async fn own_writes_are_not_external() {
        let board = board_with(BoardKind::BrandsCrm, &[("new", &["a"]), ("active", &["b"])]);
        let (_temp, store) = store_with(&board).await;
        assert_eq!(store.load_external().await.expect("load"), Some(board.clone()));

        store
            .persist_card_column(&CardId::from("a"), &ColumnId::from("active"))
            .await
            .expect("persist");
        assert_eq!(store.load_external().await.expect("load"), None);

        let edited = board_with(BoardKind::BrandsCrm, &[("churned", &["a", "b"])]);
        write_board(store.path(), &edited).await.expect("external write");
        assert_eq!(store.load_external().await.expect("load"), Some(edited));
    }

    #[test]
    fn parse_rejects_schema_violations() {
        let err = parse_board(r#"{"kind":"brands_crm","columns":"nope"}"#).expect_err("schema");
        assert!(format!("{:#}", err).contains("schema validation failed"));
    }

    #[test]
    fn parse_rejects_invariant_violations() {
        let mut board = board_with(BoardKind::BrandsCrm, &[("new", &["a"])]);
        board.columns[0].cards[0].status = ColumnId::from("active");
        let raw = render_board(&board).expect("render");
        let err = parse_board(&raw).expect_err("invariants");
        assert!(err.to_string().contains("invariants failed"));
    }

    #[tokio::test]
    async fn load_missing_file_errors_with_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(temp.path().join("missing.json"));
        let err = store.load_board().await.expect_err("missing");
        assert!(format!("{:#}", err).contains("missing.json"));
    }
}
