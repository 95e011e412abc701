//! WebSocket connection loop.
//!
//! Each accepted connection runs one read loop and one sender task. Frames
//! from the client are dispatched strictly in arrival order; everything
//! destined for the client — direct responses and hub broadcasts alike —
//! funnels through the connection's mpsc queue so the socket has a single
//! writer.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::dispatch::{ConnectionContext, dispatch_client_frame, disconnect_cleanup};
use super::messages::{ClientFrame, ServerFrame};

/// Runs a connection to completion.
///
/// Returns when the client disconnects or the socket errors; on the way
/// out every topic registration is released, so no delivery can reach the
/// connection after close.
pub async fn run_connection(
    socket: WebSocket,
    mut ctx: ConnectionContext,
    mut outbound: mpsc::Receiver<ServerFrame>,
) {
    info!(connection = %ctx.connection_id, user = %ctx.auth.user_id, "websocket connection established");

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Single socket writer draining the outbound queue.
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(err) => {
                    error!(error = %err, "failed to serialize outbound frame");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Frames from one connection are processed in arrival order; a
    // suspended snapshot fetch delays later frames rather than reordering
    // them.
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => dispatch_client_frame(&mut ctx, frame).await,
                Err(err) => {
                    debug!(connection = %ctx.connection_id, error = %err, "dropping malformed frame");
                }
            },
            Ok(Message::Binary(_)) => {
                debug!(connection = %ctx.connection_id, "dropping unexpected binary frame");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(Message::Close(_)) | Err(_) => break,
        }
    }

    disconnect_cleanup(&mut ctx).await;
    sender_task.abort();
    debug!(connection = %ctx.connection_id, "websocket connection closed");
}
