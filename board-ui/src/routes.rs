//! HTTP route handlers for the UI API.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use board::core::drag_ref::DragRef;
use board::core::types::{Board, Card, MoveRequest};
use board::reconcile::Submission;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/board", get(get_board))
        .route("/drag", get(get_drag))
        .route("/drag/start", post(drag_start))
        .route("/drag/over", post(drag_over))
        .route("/drag/end", post(drag_end))
        .route("/drag/cancel", post(drag_cancel))
        .route("/reload", post(reload))
}

type ApiError = (StatusCode, String);

async fn health() -> &'static str {
    "ok"
}

/// GET /api/board - the currently visible board.
async fn get_board(State(state): State<AppState>) -> Json<Board> {
    Json(state.board().current())
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DragView {
    pub dragging: bool,
    /// Card rendered in the overlay.
    pub active: Option<Card>,
    pub over: Option<DragRef>,
}

/// GET /api/drag - the live drag session.
async fn get_drag(State(state): State<AppState>) -> Json<DragView> {
    let session = state.drag.lock().await;
    Json(DragView {
        dragging: session.is_dragging(),
        active: session.active_card().cloned(),
        over: session.over().cloned(),
    })
}

#[derive(Debug, Deserialize)]
struct StartBody {
    source: String,
}

#[derive(Debug, Deserialize)]
struct TargetBody {
    #[serde(default)]
    target: Option<String>,
}

fn parse_ref(raw: &str) -> Result<DragRef, ApiError> {
    DragRef::parse(raw).map_err(|err| (StatusCode::BAD_REQUEST, format!("{:#}", err)))
}

fn parse_target(body: &TargetBody) -> Result<Option<DragRef>, ApiError> {
    body.target.as_deref().map(parse_ref).transpose()
}

/// POST /api/drag/start - begin dragging `source` (`column:card`).
async fn drag_start(
    State(state): State<AppState>,
    Json(body): Json<StartBody>,
) -> Result<Json<DragView>, ApiError> {
    let source = parse_ref(&body.source)?;
    let board = state.board().current();
    let mut session = state.drag.lock().await;
    if !session.drag_start(&board, &source) {
        return Err((
            StatusCode::CONFLICT,
            format!("'{}' is not a card on the board", source),
        ));
    }
    Ok(Json(DragView {
        dragging: true,
        active: session.active_card().cloned(),
        over: None,
    }))
}

/// POST /api/drag/over - update the hover target.
async fn drag_over(
    State(state): State<AppState>,
    Json(body): Json<TargetBody>,
) -> Result<StatusCode, ApiError> {
    let target = parse_target(&body)?;
    state.drag.lock().await.drag_over(target);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DropResponse {
    Unchanged,
    Reordered { request: MoveRequest },
    Persisting { request: MoveRequest },
}

/// POST /api/drag/end - release over `target` (or over nothing).
///
/// The optimistic board is published before the response; the store's
/// verdict arrives over `/events`.
async fn drag_end(
    State(state): State<AppState>,
    Json(body): Json<TargetBody>,
) -> Result<Json<DropResponse>, ApiError> {
    let target = parse_target(&body)?;
    let request = {
        let board = state.board().current();
        let mut session = state.drag.lock().await;
        session.drag_end(&board, target.as_ref())
    };
    let Some(request) = request else {
        return Ok(Json(DropResponse::Unchanged));
    };

    let response = match state.coordinator.submit(request.clone()) {
        Submission::Unchanged => DropResponse::Unchanged,
        Submission::Reordered => DropResponse::Reordered { request },
        Submission::Persisting(pending) => {
            debug!(card = %pending.request().card, "move handed to store");
            DropResponse::Persisting { request }
        }
    };
    Ok(Json(response))
}

/// POST /api/drag/cancel - abandon the drag.
async fn drag_cancel(State(state): State<AppState>) -> StatusCode {
    state.drag.lock().await.drag_cancel();
    StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub changed: bool,
}

/// POST /api/reload - replace the board with the stored document.
async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    if !state.store_path.exists() {
        return Err((
            StatusCode::NOT_FOUND,
            format!("board document {} not found", state.store_path.display()),
        ));
    }
    match state.coordinator.reload().await {
        Ok(changed) => Ok(Json(ReloadResponse { changed })),
        Err(err) => {
            warn!(error = %format!("{:#}", err), "reload failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err)))
        }
    }
}
