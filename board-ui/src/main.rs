//! Board UI server.
//!
//! Mounts the board of one project, serves the drag protocol under `/api`,
//! pushes board snapshots and rollback notices over `/events`, and follows
//! external edits of the board document.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "board-ui")]
#[command(about = "Web UI for dragging cards across a board")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Project directory (contains .board/)
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Built front-end to serve (defaults to ui/dist in the project)
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

/// API, event stream and, when `ui_dir` exists, the static front-end.
fn router(state: AppState, ui_dir: &Path) -> Router {
    // The front-end dev server runs on another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", routes::api_router())
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state);

    if ui_dir.exists() {
        info!(ui_dir = %ui_dir.display(), "serving board front-end");
        app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true))
    } else {
        info!(ui_dir = %ui_dir.display(), "no front-end build, API-only mode");
        app
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("board_ui=info".parse()?)
                .add_directive("board=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let project_dir = args.project_dir.canonicalize().unwrap_or(args.project_dir);
    let state = AppState::open(project_dir.clone()).await?;
    info!(
        project_dir = %project_dir.display(),
        kind = state.config.kind.label(),
        "board mounted for UI"
    );
    sse::start_store_watcher(state.clone());

    let ui_dir = args
        .ui_dir
        .unwrap_or_else(|| project_dir.join("ui").join("dist"));
    let app = router(state.clone(), &ui_dir);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    // In-flight rejections after shutdown must not touch the board.
    state.board().teardown();
    Ok(())
}
