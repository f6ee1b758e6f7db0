use std::borrow::Cow;
use std::sync::Arc;
use axum::{
    extract::{ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade}, Query, State},
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::models::Identity;
use crate::state::AppState;
use crate::utils::abort_guard::AbortOnDrop;
use crate::websocket::session::Session;
use crate::ws::connctx::{random_color, ConnHandle};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// WebSocket handler
pub async fn websocket_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    info!("New WebSocket connection attempt");
    let identity = app_state.identities.resolve(&headers, params.token.as_deref());
    ws.on_upgrade(move |socket| async move {
        match identity {
            Some(identity) => handle_socket(socket, identity, app_state).await,
            None => refuse_socket(socket).await,
        }
    })
}

/// Close an unauthenticated connection before reading anything from it.
async fn refuse_socket(mut socket: WebSocket) {
    warn!("Refusing unauthenticated WebSocket connection");
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: Cow::from("Authentication required"),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!("Failed to send policy close frame: {}", e);
    }
}

/// Handle an authenticated WebSocket connection
async fn handle_socket(socket: WebSocket, identity: Identity, app_state: Arc<AppState>) {
    let (conn, mut outbound) = ConnHandle::new(app_state.config.outbound_buffer);
    let color = random_color();
    info!(
        "WebSocket connection {} established for user {} with color {}",
        conn.id(),
        identity.username,
        color
    );

    // Split the socket; the writer task owns the sink and drains the outbound queue.
    let (mut sender, mut receiver) = socket.split();
    let writer_conn = conn.clone();
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                writer_conn.shutdown();
                break;
            }
        }
    });
    let _writer_guard = AbortOnDrop::new(writer);

    let mut session = Session::new(conn.clone(), identity, color);
    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => session.dispatch(&app_state, &text).await,
                Some(Ok(Message::Binary(_))) => debug!("Ignoring binary frame on connection {}", conn.id()),
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client closed connection {}", conn.id());
                    break;
                }
                // Ping and pong are answered by axum
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Transport error on connection {}: {}", conn.id(), e);
                    break;
                }
            },
            _ = conn.wait_shutdown() => {
                info!("Connection {} shut down after failed delivery", conn.id());
                break;
            }
        }
    }

    session.close(&app_state).await;
    info!("WebSocket connection terminated");
}
