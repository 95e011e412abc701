//! Axum WebSocket upgrade handler.
//!
//! Authentication happens before the upgrade is accepted: a failed
//! `authenticate` rejects the request with a 401 response and no
//! connection state is ever created. A failure of the upgrade itself
//! (axum's own extractor path) is a distinct transport-level response.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::info;

use super::connection::run_connection;
use super::dispatch::ConnectionContext;
use crate::app_state::AppState;

/// Handshake query parameters.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Opaque authentication token.
    pub token: Option<String>,
}

/// `GET /ws?token=...` — Upgrade to a channel-protocol WebSocket.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let auth = match state.authenticator.authenticate(query.token.as_deref()).await {
        Ok(auth) => auth,
        Err(err) => {
            info!(error = %err, "rejected websocket handshake");
            return err.into_response();
        }
    };

    let (tx, outbound) = mpsc::channel(state.config.connection_queue_capacity);
    let ctx = ConnectionContext::new(
        auth,
        tx,
        Arc::clone(&state.registry),
        state.hub.clone(),
        state.message_handler.clone(),
        Duration::from_secs(state.config.handler_timeout_secs),
    );

    ws.on_upgrade(move |socket| run_connection(socket, ctx, outbound))
}
