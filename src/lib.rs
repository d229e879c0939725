pub mod args;
pub mod broadcast;
pub mod coordinator;
pub mod error;
pub mod lobby;
pub mod room;
pub mod rotation;
pub mod session;
pub mod state;
pub mod timer;

use crate::{
    coordinator::{GameService, Settings},
    state::ServerState,
};
use axum::{
    extract::{FromRef, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use painter_models::MAX_MESSAGE_SIZE;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::prelude::*;

pub fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "painter_server=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(false)
                .with_target(false),
        )
        .init();
}

#[derive(Clone)]
pub struct AppState {
    pub state: ServerState,
    pub games: GameService,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let state = ServerState::new();
        let games = GameService::new(Arc::new(state.clone()), settings);
        Self { state, games }
    }
}

impl FromRef<AppState> for GameService {
    fn from_ref(input: &AppState) -> Self {
        input.games.clone()
    }
}

pub async fn run(addr: SocketAddr, settings: Settings) -> anyhow::Result<()> {
    let app = app(AppState::new(settings));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/games", get(list_games_handler))
        .route("/stats", get(stats_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn list_games_handler(State(games): State<GameService>) -> impl IntoResponse {
    Json(games.lobby_games())
}

#[derive(Serialize)]
struct StatsResponse {
    games: usize,
    connections: usize,
}

async fn stats_handler(State(app): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        games: app.games.game_count(),
        connections: app.state.peer_count(),
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(app): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| session::handle_socket(socket, app.state, app.games))
}
