//! Server-Sent Events stream and store watcher.

use std::convert::Infallible;
use std::path::Path;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use board::core::types::Board;
use futures::stream::Stream;
use notify::{Event as NotifyEvent, EventKind, PollWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::state::{AppState, UiEvent};

#[derive(Serialize)]
struct ErrorPayload<'a> {
    message: &'a str,
}

fn board_event(board: &Board) -> Option<Event> {
    serde_json::to_string(board)
        .ok()
        .map(|json| Event::default().event("board").data(json))
}

fn ui_event(event: &UiEvent) -> Option<Event> {
    match event {
        UiEvent::MoveFailed(message) => serde_json::to_string(&ErrorPayload { message })
            .ok()
            .map(|json| Event::default().event("error").data(json)),
    }
}

/// SSE endpoint handler.
///
/// Sends the current board on connect, then every published board and every
/// rollback notice.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut boards = state.board().subscribe();
    let mut notices = state.event_tx.subscribe();

    let stream = async_stream::stream! {
        let initial = boards.borrow_and_update().clone();
        if let Some(event) = board_event(&initial) {
            yield Ok(event);
        }

        loop {
            let next = tokio::select! {
                changed = boards.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let board = boards.borrow_and_update().clone();
                    board_event(&board)
                }
                notice = notices.recv() => match notice {
                    Ok(notice) => ui_event(&notice),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "SSE client lagged, some notices dropped");
                        None
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            if let Some(event) = next {
                yield Ok(event);
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Start the store watcher in a background task.
pub fn start_store_watcher(state: AppState) {
    tokio::spawn(async move {
        if let Err(e) = run_store_watcher(state).await {
            warn!(error = %e, "store watcher failed");
        }
    });
}

async fn run_store_watcher(state: AppState) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel::<NotifyEvent>(100);
    let interval = Duration::from_millis(state.config.watch_interval_ms);

    let mut watcher = PollWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.try_send(event);
            }
        },
        notify::Config::default().with_poll_interval(interval),
    )?;

    // Watch the directory so atomic renames over the document are seen.
    let watch_dir = state
        .store_path
        .parent()
        .unwrap_or(state.project_dir.as_path())
        .to_path_buf();
    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
    info!(path = %state.store_path.display(), "watching board document");

    let mut pending = false;
    let mut flush_tick = tokio::time::interval(interval);
    flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                pending |= touches_store(&state.store_path, &event);
            }
            _ = flush_tick.tick() => {
                if !pending {
                    continue;
                }
                pending = false;
                match state.coordinator.refresh().await {
                    Ok(true) => debug!("board replaced by external edit"),
                    Ok(false) => {}
                    Err(err) => warn!(error = %format!("{:#}", err), "board reload failed"),
                }
            }
        }
    }
}

fn touches_store(store_path: &Path, event: &NotifyEvent) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|path| path == store_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn event(kind: EventKind, path: PathBuf) -> NotifyEvent {
        NotifyEvent {
            kind,
            paths: vec![path],
            attrs: Default::default(),
        }
    }

    #[test]
    fn store_modification_triggers_reload() {
        let store = PathBuf::from("/tmp/project/.board/board.json");
        let modify = event(
            EventKind::Modify(notify::event::ModifyKind::Any),
            store.clone(),
        );
        assert!(touches_store(&store, &modify));
    }

    #[test]
    fn temp_file_and_removal_are_ignored() {
        let store = PathBuf::from("/tmp/project/.board/board.json");
        let temp = event(
            EventKind::Create(notify::event::CreateKind::File),
            store.with_extension("json.tmp"),
        );
        let removed = event(
            EventKind::Remove(notify::event::RemoveKind::File),
            store.clone(),
        );
        assert!(!touches_store(&store, &temp));
        assert!(!touches_store(&store, &removed));
    }

    #[test]
    fn error_notice_serializes_message() {
        let notice = UiEvent::MoveFailed("Could not move Acme to Active".to_string());
        assert!(ui_event(&notice).is_some());
        let json = serde_json::to_string(&ErrorPayload {
            message: "Could not move Acme to Active",
        })
        .expect("json");
        assert_eq!(json, r#"{"message":"Could not move Acme to Active"}"#);
    }
}
