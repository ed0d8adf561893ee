//! HTTP routes for the launch bridge.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn};

use super::pages;
use crate::catalog::GameCatalog;
use crate::config::LauncherConfig;
use crate::orchestrator::artifact::{generate, SessionManifest};
use crate::orchestrator::spawner::SessionSpawner;
use crate::{AppError, Result};

/// Shared state for bridge handlers.
pub struct BridgeState {
    /// Validated launcher configuration.
    pub config: Arc<LauncherConfig>,
    /// Resolver over the games root.
    pub catalog: GameCatalog,
    /// Starts detached supervisors.
    pub spawner: Arc<dyn SessionSpawner>,
}

impl BridgeState {
    /// Build bridge state from configuration and a spawner.
    #[must_use]
    pub fn new(config: Arc<LauncherConfig>, spawner: Arc<dyn SessionSpawner>) -> Self {
        let catalog = GameCatalog::from_config(&config);
        Self {
            config,
            catalog,
            spawner,
        }
    }
}

/// Receipt for a session handed to a detached supervisor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LaunchTicket {
    /// Normalized game identifier.
    pub game_id: String,
    /// Directory name of the game.
    pub display_name: String,
    /// Session identifier written into the manifest.
    pub session_id: String,
    /// Process id of the detached supervisor.
    pub supervisor_pid: u32,
    /// Manifest now owned by the supervisor.
    pub manifest: PathBuf,
}

/// Resolve, generate, and spawn a detached supervisor for `identifier`.
///
/// Nothing is spawned when resolution fails. When the spawn itself fails
/// the manifest is removed again, since no supervisor took ownership.
///
/// # Errors
///
/// Returns `AppError::NotFound`, `AppError::Generation`, or
/// `AppError::Spawn` for the respective stage.
pub fn launch_detached(state: &BridgeState, identifier: &str) -> Result<LaunchTicket> {
    let span = info_span!("launch_detached", game = identifier);
    let _guard = span.enter();

    let descriptor = state.catalog.resolve(identifier)?;
    let command = state.catalog.command_for(&descriptor);
    let manifest = SessionManifest::new(descriptor, command, state.config.control.clone());
    let artifact = generate(&state.config.artifact_dir(), &manifest)?;

    let supervisor_pid = match state.spawner.spawn_detached(artifact.path()) {
        Ok(pid) => pid,
        Err(err) => {
            if let Err(remove_err) = artifact.remove() {
                warn!(%remove_err, path = %artifact.path().display(), "orphaned manifest not removed");
            }
            return Err(err);
        }
    };

    info!(
        session_id = %manifest.session_id,
        supervisor_pid,
        "session handed to detached supervisor"
    );

    Ok(LaunchTicket {
        game_id: manifest.descriptor.id,
        display_name: manifest.descriptor.display_name,
        session_id: manifest.session_id,
        supervisor_pid,
        manifest: artifact.path().to_path_buf(),
    })
}

/// `?game=<id>` query parameter.
#[derive(Debug, Deserialize)]
struct GameQuery {
    game: Option<String>,
}

impl GameQuery {
    fn requested(&self) -> Option<&str> {
        self.game.as_deref().map(str::trim).filter(|g| !g.is_empty())
    }
}

fn error_response(err: &AppError) -> Response {
    let status = match err {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Html(pages::error_page(&err.to_string()))).into_response()
}

/// Run catalog and manifest filesystem work on the blocking pool.
async fn off_runtime<T, F>(state: &Arc<BridgeState>, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&BridgeState) -> Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .map_err(|err| AppError::Bridge(format!("blocking task failed: {err}")))?
}

/// `GET /launch-game?game=<id>`.
async fn launch_game(
    State(state): State<Arc<BridgeState>>,
    Query(query): Query<GameQuery>,
) -> Response {
    let Some(game) = query.requested().map(str::to_owned) else {
        return error_response(&AppError::NotFound("no game requested".into()));
    };

    let requested = game.clone();
    match off_runtime(&state, move |state| launch_detached(state, &requested)).await {
        Ok(ticket) => Html(pages::launched_redirect(&ticket.game_id)).into_response(),
        Err(err) => {
            warn!(%err, game = %game, "launch request failed");
            error_response(&err)
        }
    }
}

/// `GET /game-launched?game=<id>`.
async fn game_launched(
    State(state): State<Arc<BridgeState>>,
    Query(query): Query<GameQuery>,
) -> Response {
    let Some(game) = query.requested().map(str::to_owned) else {
        return error_response(&AppError::NotFound("no game requested".into()));
    };

    let requested = game.clone();
    let display_name = off_runtime(&state, move |state| state.catalog.resolve(&requested))
        .await
        .map_or(game, |descriptor| descriptor.display_name);
    Html(pages::launched_page(
        &display_name,
        &state.config.control.terminate_key,
    ))
    .into_response()
}

/// `GET /games`.
async fn list_games(State(state): State<Arc<BridgeState>>) -> Response {
    match off_runtime(&state, |state| state.catalog.list()).await {
        Ok(games) => Json(games).into_response(),
        Err(err) => error_response(&err),
    }
}

/// `GET /health`.
async fn health() -> &'static str {
    "ok"
}

/// Attach permissive CORS headers and answer preflight requests directly.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// Build the bridge router.
pub fn router(state: Arc<BridgeState>) -> Router {
    Router::new()
        .route("/launch-game", get(launch_game))
        .route("/game-launched", get(game_launched))
        .route("/games", get(list_games))
        .route("/health", get(health))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// Bind `bind_address:http_port` and serve until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Bridge` if the listener cannot bind or the server
/// fails.
pub async fn serve(state: Arc<BridgeState>, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::new(state.config.bind_address, state.config.http_port);
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Bridge(format!("failed to bind {bind}: {err}")))?;
    serve_listener(listener, state, ct).await
}

/// Serve the bridge on an already bound listener until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Bridge` if the server fails.
pub async fn serve_listener(
    listener: TcpListener,
    state: Arc<BridgeState>,
    ct: CancellationToken,
) -> Result<()> {
    let local = listener
        .local_addr()
        .map_err(|err| AppError::Bridge(format!("listener has no address: {err}")))?;
    info!(%local, "launch bridge listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Bridge(format!("server error: {err}")))?;

    info!("launch bridge shut down");
    Ok(())
}
