//! HTTP and WebSocket surface.
//!
//! Each WebSocket connection becomes one hub subscriber. The socket task
//! forwards hub events as JSON text frames, runs the handshake alongside, and
//! unsubscribes when either side hangs up.

use crate::fetch::HttpFetcher;
use crate::handshake::greet;
use crate::hub::SubscriberHub;
use crate::pipeline::Harvest;
use crate::store::SqliteStore;
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, warn};

pub struct AppState {
    pub fetcher: Arc<HttpFetcher>,
    pub store: Arc<SqliteStore>,
    pub hub: SubscriberHub,
    pub harvest: Harvest,
    /// Trailing window for the initial recent-activity count.
    pub recent_window: Duration,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            },
        ))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (id, mut events) = state.hub.subscribe().await;
    let (mut sink, mut incoming) = socket.split();

    let greeting = {
        let state = state.clone();
        tokio::spawn(async move {
            greet(
                id,
                state.fetcher.as_ref(),
                state.store.as_ref(),
                &state.hub,
                &state.harvest,
                state.recent_window,
            )
            .await
        })
    };

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(subscriber = id, error = %e, "Could not encode event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = incoming.next().await {
            if let Message::Close(_) = message {
                break;
            }
            debug!(subscriber = id, "Ignoring inbound message");
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    greeting.abort();
    state.hub.unsubscribe(id).await;
    let remaining = state.hub.len().await;
    debug!(subscriber = id, remaining, "Socket closed");
}
