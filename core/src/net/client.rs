//! Per-connection WebSocket task

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use statecast_shared::decode_command;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::session::{ClientId, SessionInput};

/// Router state shared by every connection
#[derive(Debug, Clone)]
pub(super) struct Transport {
    pub inputs: mpsc::Sender<SessionInput<Utf8Bytes>>,
    pub next_id: Arc<AtomicU64>,
    pub outbound_queue: usize,
}

/// `GET /`: upgrade and hand the socket to its own task.
pub(super) async fn upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(transport): State<Transport>,
) -> Response {
    let id = ClientId(transport.next_id.fetch_add(1, Ordering::Relaxed));
    tracing::debug!(client = %id, %peer, "WebSocket upgrade");
    ws.on_upgrade(move |socket| serve_client(socket, id, transport))
}

/// Forward snapshots out and button commands in until either side closes.
async fn serve_client(mut socket: WebSocket, id: ClientId, transport: Transport) {
    let (outbox, mut frames) = mpsc::channel(transport.outbound_queue);
    if transport
        .inputs
        .send(SessionInput::Connected { id, outbox })
        .await
        .is_err()
    {
        tracing::debug!(client = %id, "Session stopped, refusing client");
        return;
    }

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(text) => {
                    if let Err(e) = socket.send(Message::Text(text)).await {
                        tracing::debug!(client = %id, error = %e, "Send failed");
                        break;
                    }
                }
                // The loop dropped this client
                None => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            message = socket.recv() => match message {
                Some(Ok(Message::Text(text))) => forward_command(&transport, id, text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(client = %id, error = %e, "Receive failed");
                    break;
                }
            },
        }
    }

    // Fails only when the loop has already stopped
    let _ = transport.inputs.send(SessionInput::Disconnected { id }).await;
}

fn forward_command(transport: &Transport, client: ClientId, text: &str) {
    let button = match decode_command(text) {
        Ok(Some(button)) => button,
        Ok(None) => {
            tracing::debug!(%client, "Message without button ignored");
            return;
        }
        Err(e) => {
            tracing::warn!(%client, error = %e, "Ignoring client message");
            return;
        }
    };

    match transport
        .inputs
        .try_send(SessionInput::Button { client, button })
    {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            tracing::warn!(%client, %button, "Input queue full, command dropped");
        }
        Err(TrySendError::Closed(_)) => {}
    }
}
