// SPDX-License-Identifier: MIT

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::error::{EngineError, EventError};
use crate::engine::events::{BroadcastSink, EventSink, LogSink, PlaybackEvent};
use crate::engine::graph::{Graph, GraphSource, SharedGraph};
use crate::engine::scheduler::{PlaybackSnapshot, Player};
use crate::engine::sequence::{build_sequence, ExecutionSequence};
use crate::engine::PlaybackConfig;
use crate::studio::loader::GraphLoader;

const EVENT_BUFFER: usize = 256;

/// Shared state behind the HTTP surface
#[derive(Clone)]
pub struct AppState {
    graph: SharedGraph,
    player: Player,
    events: BroadcastSink,
}

/// Sends every event to the subscribers and to the log
struct TeeSink {
    broadcast: BroadcastSink,
    log: LogSink,
}

impl EventSink for TeeSink {
    fn send(&self, event: PlaybackEvent) -> Result<(), EventError> {
        self.broadcast.send(event.clone())?;
        self.log.send(event)
    }
}

impl AppState {
    /// Must be called inside a tokio runtime
    pub fn new(graph: Graph, config: PlaybackConfig) -> Result<Self, EngineError> {
        let graph = SharedGraph::new(graph);
        let events = BroadcastSink::new(EVENT_BUFFER);
        let sink = Arc::new(TeeSink {
            broadcast: events.clone(),
            log: LogSink,
        });
        let player = Player::new(Arc::new(graph.clone()), sink, config)?;

        Ok(Self {
            graph,
            player,
            events,
        })
    }

    pub fn player(&self) -> &Player {
        &self.player
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/graph", get(get_graph).put(put_graph))
        .route("/api/sequence", get(get_sequence))
        .route("/api/playback", get(get_playback))
        .route("/api/playback/play", post(play))
        .route("/api/playback/pause", post(pause))
        .route("/api/playback/restart", post(restart))
        .route("/api/playback/debug", post(debug))
        .route("/api/playback/events", get(stream_events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(port: u16, state: AppState) -> Result<(), EngineError> {
    let app = router(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let result = axum::serve(listener, app).await;
    state.player.shutdown();
    result?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_graph(State(state): State<AppState>) -> Json<Graph> {
    Json(state.graph.snapshot())
}

async fn put_graph(
    State(state): State<AppState>,
    Json(graph): Json<Graph>,
) -> (StatusCode, Json<Value>) {
    if let Err(e) = GraphLoader::validate(&graph) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        );
    }

    let counts = json!({
        "status": "ok",
        "nodes": graph.nodes.len(),
        "edges": graph.edges.len(),
    });
    state.graph.replace(graph);
    log::info!("Graph replaced: {}", counts);
    (StatusCode::OK, Json(counts))
}

async fn get_sequence(State(state): State<AppState>) -> Json<ExecutionSequence> {
    Json(build_sequence(&state.graph.snapshot()))
}

async fn get_playback(State(state): State<AppState>) -> Json<PlaybackSnapshot> {
    Json(state.player.snapshot())
}

async fn play(State(state): State<AppState>) -> Json<PlaybackSnapshot> {
    state.player.play();
    Json(state.player.snapshot())
}

async fn pause(State(state): State<AppState>) -> Json<PlaybackSnapshot> {
    state.player.pause();
    Json(state.player.snapshot())
}

async fn restart(State(state): State<AppState>) -> Json<PlaybackSnapshot> {
    state.player.restart();
    Json(state.player.snapshot())
}

async fn debug(State(state): State<AppState>) -> Json<PlaybackSnapshot> {
    state.player.debug();
    Json(state.player.snapshot())
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(|received| {
        match received {
            Ok(event) => match Event::default().event("playback").json_data(&event) {
                Ok(sse) => Some(Ok::<_, Infallible>(sse)),
                Err(e) => {
                    log::warn!("Failed to encode playback event: {}", e);
                    None
                }
            },
            // Slow subscriber; skip what it missed
            Err(e) => {
                log::warn!("Event stream lagged: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1)))
}
