//! Shared application state for the UI server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use board::commands::Project;
use board::core::drag::DragSession;
use board::io::config::BoardConfig;
use board::io::store::JsonFileStore;
use board::reconcile::{Coordinator, ErrorSink};
use board::state::BoardState;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

/// Notices broadcast to SSE clients alongside board snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A move was rejected by the store and rolled back.
    MoveFailed(String),
}

/// Error sink that fans rollback notices out to every connected client.
pub struct BroadcastSink {
    tx: broadcast::Sender<UiEvent>,
}

impl ErrorSink for BroadcastSink {
    fn report(&self, message: String) {
        if self.tx.send(UiEvent::MoveFailed(message)).is_err() {
            debug!("no SSE clients connected, notice dropped");
        }
    }
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Root directory of the project (contains .board/).
    pub project_dir: PathBuf,
    pub config: BoardConfig,
    /// Board document watched for external changes.
    pub store_path: PathBuf,
    pub coordinator: Arc<Coordinator<JsonFileStore>>,
    /// One drag at a time, as a single pointer allows.
    pub drag: Arc<Mutex<DragSession>>,
    /// Broadcast sender for rollback notices.
    pub event_tx: broadcast::Sender<UiEvent>,
}

impl AppState {
    /// Open the project in `project_dir` and mount its board.
    pub async fn open(project_dir: PathBuf) -> Result<Self> {
        let project = Project::open(&project_dir)?;
        // Refuse to serve a board of the wrong kind.
        project.load_board().await?;

        let (event_tx, _) = broadcast::channel(64);
        let sink = Arc::new(BroadcastSink {
            tx: event_tx.clone(),
        });
        let store_path = project.store.path().to_path_buf();
        let coordinator = Coordinator::mount(Arc::clone(&project.store), sink).await?;
        let drag = DragSession::new(project.config.activation());

        Ok(Self {
            project_dir,
            config: project.config,
            store_path,
            coordinator: Arc::new(coordinator),
            drag: Arc::new(Mutex::new(drag)),
            event_tx,
        })
    }

    pub fn board(&self) -> &BoardState {
        self.coordinator.state()
    }
}
