//! Test-only helpers: board builders and scripted collaborators.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::oneshot;

use crate::core::types::{Board, BoardKind, Card, CardId, ColumnId};
use crate::io::config::{BoardConfig, load_config};
use crate::io::init::{BoardPaths, InitOptions, init_board};
use crate::io::store::{JsonFileStore, RemoteStore, render_board};
use crate::reconcile::ErrorSink;

/// Create a deterministic card owned by `column`.
pub fn card(id: &str, column: &str) -> Card {
    let mut metrics = BTreeMap::new();
    metrics.insert("followers".to_string(), 1_000);
    Card {
        id: CardId::from(id),
        status: ColumnId::from(column),
        name: format!("{} name", id),
        image_url: None,
        metrics,
    }
}

/// Board of `kind` with the listed cards placed in the named columns.
///
/// Panics on a column that is not a stage of `kind`.
pub fn board_with(kind: BoardKind, columns: &[(&str, &[&str])]) -> Board {
    let mut board = Board::empty(kind);
    for (column, cards) in columns {
        let index = board
            .column_index(&ColumnId::from(*column))
            .unwrap_or_else(|| panic!("column '{}' is not a {} stage", column, kind.label()));
        board.columns[index].cards = cards.iter().map(|id| card(id, column)).collect();
    }
    board
}

/// Card ids of `column`, in order.
pub fn card_ids<'a>(board: &'a Board, column: &str) -> Vec<&'a str> {
    board
        .column(&ColumnId::from(column))
        .map(|col| col.cards.iter().map(|card| card.id.as_str()).collect())
        .unwrap_or_default()
}

/// Store returning a fixed board and queued persistence results.
///
/// Once the queue is empty every call succeeds. All calls are recorded.
pub struct ScriptedStore {
    board: Board,
    results: Mutex<VecDeque<Result<(), String>>>,
    calls: Mutex<Vec<(CardId, ColumnId)>>,
}

impl ScriptedStore {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            results: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_results(self, results: Vec<Result<(), String>>) -> Self {
        *self.results.lock().expect("results lock") = results.into();
        self
    }

    pub fn calls(&self) -> Vec<(CardId, ColumnId)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    async fn load_board(&self) -> Result<Board> {
        Ok(self.board.clone())
    }

    async fn persist_card_column(&self, card: &CardId, column: &ColumnId) -> Result<()> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((card.clone(), column.clone()));
        let next = self.results.lock().expect("results lock").pop_front();
        match next {
            Some(Err(message)) => Err(anyhow!(message)),
            Some(Ok(())) | None => Ok(()),
        }
    }
}

struct GatedCall {
    card: CardId,
    resolve: oneshot::Sender<Result<(), String>>,
}

/// Store whose persistence calls stay pending until the test resolves them.
///
/// Lets tests control the order in which overlapping moves settle.
pub struct GatedStore {
    board: Board,
    pending: Mutex<Vec<GatedCall>>,
}

impl GatedStore {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Yield to the runtime until `count` calls are waiting.
    pub async fn wait_for_pending(&self, count: usize) {
        for _ in 0..1_000 {
            if self.pending.lock().expect("pending lock").len() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {} pending persistence calls", count);
    }

    /// Resolve the oldest pending call for `card` with `result`.
    pub fn resolve(&self, card: &str, result: Result<(), String>) {
        let mut pending = self.pending.lock().expect("pending lock");
        let index = pending
            .iter()
            .position(|call| call.card.as_str() == card)
            .unwrap_or_else(|| panic!("no pending call for '{}'", card));
        let call = pending.remove(index);
        let _ = call.resolve.send(result);
    }
}

#[async_trait]
impl RemoteStore for GatedStore {
    async fn load_board(&self) -> Result<Board> {
        Ok(self.board.clone())
    }

    async fn persist_card_column(&self, card: &CardId, _column: &ColumnId) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().expect("pending lock").push(GatedCall {
            card: card.clone(),
            resolve: tx,
        });
        let result = rx.await.context("gated call dropped")?;
        result.map_err(|message| anyhow!(message))
    }
}

/// Error sink that keeps every message.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("messages lock").clone()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, message: String) {
        self.messages.lock().expect("messages lock").push(message);
    }
}

/// Temporary project with an initialized `.board/` directory.
pub struct TempBoard {
    dir: TempDir,
    paths: BoardPaths,
    config: BoardConfig,
}

impl TempBoard {
    /// Initialize a project holding `board`.
    pub fn new(board: &Board) -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        let options = InitOptions {
            force: false,
            kind: board.kind,
        };
        let paths = init_board(dir.path(), &options)?;
        let config = load_config(&paths.config_path)?;
        let temp = Self { dir, paths, config };
        temp.write_board(board)?;
        Ok(temp)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> &BoardPaths {
        &self.paths
    }

    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(self.paths.store_path(&self.config))
    }

    /// Overwrite the board document.
    pub fn write_board(&self, board: &Board) -> Result<()> {
        let path = self.paths.store_path(&self.config);
        std::fs::write(&path, render_board(board)?)
            .with_context(|| format!("write {}", path.display()))
    }
}
