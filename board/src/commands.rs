//! Orchestration for `board` CLI commands.
//!
//! Each command loads the project config, mounts the board from the file
//! store and drives the core/reconcile layers. Outcomes are returned as values
//! so the binary can map them to exit codes.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;
use tracing::debug;

use crate::core::drag::DragSession;
use crate::core::drag_ref::DragRef;
use crate::core::types::{Board, CardId, ColumnId, MoveRequest};
use crate::exit_codes;
use crate::io::config::{BoardConfig, load_config};
use crate::io::init::BoardPaths;
use crate::io::store::{JsonFileStore, RemoteStore};
use crate::reconcile::{Coordinator, MoveOutcome, Submission};

/// Config and store of an initialized project.
pub struct Project {
    pub paths: BoardPaths,
    pub config: BoardConfig,
    pub store: Arc<JsonFileStore>,
}

impl Project {
    pub fn open(root: &Path) -> Result<Self> {
        let paths = BoardPaths::new(root);
        if !paths.board_dir.is_dir() {
            return Err(anyhow!(
                "no .board directory in {} (run `board init`)",
                root.display()
            ));
        }
        let config = load_config(&paths.config_path)?;
        let store = Arc::new(JsonFileStore::new(paths.store_path(&config)));
        Ok(Self {
            paths,
            config,
            store,
        })
    }

    /// Load the board and check it matches the configured kind.
    pub async fn load_board(&self) -> Result<Board> {
        let board = self.store.load_board().await?;
        if board.kind != self.config.kind {
            return Err(anyhow!(
                "board kind '{}' does not match config kind '{}'",
                board.kind.label(),
                self.config.kind.label()
            ));
        }
        Ok(board)
    }
}

/// Result of a `move` or `drop` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveReport {
    /// No move was produced or it changed nothing.
    Unchanged,
    /// Order changed within a column; column ownership is unchanged.
    Reordered(MoveRequest),
    Committed(MoveRequest),
    /// Rejected by the store; `notices` holds the user-facing messages.
    RolledBack {
        request: MoveRequest,
        notices: Vec<String>,
    },
}

impl MoveReport {
    pub fn exit_code(&self) -> i32 {
        match self {
            MoveReport::Unchanged => exit_codes::UNCHANGED,
            MoveReport::Reordered(_) | MoveReport::Committed(_) => exit_codes::OK,
            MoveReport::RolledBack { .. } => exit_codes::REJECTED,
        }
    }
}

/// Validate the board document (schema, invariants, kind).
pub async fn validate(root: &Path) -> Result<Board> {
    let project = Project::open(root)?;
    project.load_board().await
}

/// Move `card` to `column`, appending or inserting at `index`.
pub async fn move_card(
    root: &Path,
    card: &CardId,
    column: &ColumnId,
    index: Option<usize>,
) -> Result<MoveReport> {
    let project = Project::open(root)?;
    let board = project.load_board().await?;
    let (from, _) = board
        .locate(card)
        .ok_or_else(|| anyhow!("card '{}' not found", card))?;
    let request = MoveRequest {
        card: card.clone(),
        from: board.columns[from].id.clone(),
        to: column.clone(),
        to_index: index,
    };
    if board.column(column).is_none() {
        return Err(anyhow!("unknown column '{}'", column));
    }
    apply(&project, request).await
}

/// Replay a drag from `source` released over `target` (or over nothing).
pub async fn drop_card(
    root: &Path,
    source: &DragRef,
    target: Option<&DragRef>,
) -> Result<MoveReport> {
    let project = Project::open(root)?;
    let board = project.load_board().await?;
    let mut session = DragSession::new(project.config.activation());
    if !session.drag_start(&board, source) {
        debug!(source = %source, "drag source not on board");
        return Ok(MoveReport::Unchanged);
    }
    match session.drag_end(&board, target) {
        Some(request) => apply(&project, request).await,
        None => {
            debug!(source = %source, "drag released without a target");
            Ok(MoveReport::Unchanged)
        }
    }
}

async fn apply(project: &Project, request: MoveRequest) -> Result<MoveReport> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let coordinator = Coordinator::mount(Arc::clone(&project.store), Arc::new(tx)).await?;

    let pending = match coordinator.submit(request.clone()) {
        Submission::Unchanged => return Ok(MoveReport::Unchanged),
        Submission::Reordered => return Ok(MoveReport::Reordered(request)),
        Submission::Persisting(pending) => pending,
    };

    let outcome = pending.settled().await.context("settle move")?;
    coordinator.state().teardown();
    match outcome {
        MoveOutcome::Committed => Ok(MoveReport::Committed(request)),
        MoveOutcome::RolledBack | MoveOutcome::Detached => {
            let mut notices = Vec::new();
            while let Ok(notice) = rx.try_recv() {
                notices.push(notice);
            }
            Ok(MoveReport::RolledBack { request, notices })
        }
    }
}
