//! WebSocket connection handler
//!
//! Drives one accepted connection through
//! `Accepted → Handshaking → Active → Closed`: upgrade, read the display
//! name, relay every following text frame through the registry, and
//! unregister on the way out no matter how the connection ended.

use std::sync::Arc;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::message::Outbound;
use crate::registry::Registry;
use crate::types::{ClientId, ConnectionState};

/// Outbound queue size per connection
const OUTBOUND_BUFFER_SIZE: usize = 32;

/// Handle a new TCP connection
///
/// Performs the WebSocket upgrade (only on `path`), then serves the
/// connection until it closes.
pub async fn handle_connection(
    stream: TcpStream,
    registry: Registry,
    path: Arc<str>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {} ({})", peer_addr, ConnectionState::Accepted);

    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        move |request: &Request, response: Response| {
            if request.uri().path() == &*path {
                Ok(response)
            } else {
                Err(not_found(request.uri().path()))
            }
        },
    )
    .await?;

    serve_connection(ws_stream, registry, peer_addr).await
}

/// Serve an upgraded WebSocket connection
///
/// Split out from [`handle_connection`] so any stream type can be served.
pub async fn serve_connection<S>(
    ws_stream: WebSocketStream<S>,
    registry: Registry,
    peer_addr: String,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let client_id = ClientId::new();
    let mut state = ConnectionState::Handshaking;
    debug!("Client {} from {} is {}", client_id, peer_addr, state);

    // First text frame is the display name, taken verbatim
    let name = match next_text(&mut ws_receiver).await {
        Ok(Some(name)) => name,
        Ok(None) => {
            info!("Client {} closed before sending a name", client_id);
            return Ok(());
        }
        Err(e) => {
            log_close(client_id, None, state, &e);
            return Err(e);
        }
    };

    let (msg_tx, mut msg_rx) = mpsc::channel::<Outbound>(OUTBOUND_BUFFER_SIZE);
    registry.register(client_id, name.clone(), msg_tx).await;
    state = ConnectionState::Active;
    info!("Client {} joined as '{}' from {} ({})", client_id, name, peer_addr, state);

    // Write task (outbound queue -> WebSocket)
    let mut write_task = tokio::spawn(async move {
        while let Some(item) = msg_rx.recv().await {
            match item {
                Outbound::Text(text) => {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Outbound::Close => break,
            }
        }
        debug!("Write task ended for client");

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    let result = tokio::select! {
        result = relay_loop(&mut ws_receiver, &registry, client_id, &name) => result,
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
            Ok(())
        }
    };

    // Always runs, whatever ended the loop
    registry.unregister(client_id).await;
    write_task.abort();
    state = ConnectionState::Closed;

    match &result {
        Ok(()) => info!("Client {} ('{}') disconnected", client_id, name),
        Err(e) => log_close(client_id, Some(&name), state, e),
    }

    result
}

/// Active state: relay each received text frame until the stream ends
async fn relay_loop<S>(
    ws_receiver: &mut SplitStream<WebSocketStream<S>>,
    registry: &Registry,
    client_id: ClientId,
    name: &str,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(text) = next_text(ws_receiver).await? {
        let delivered = registry.broadcast(client_id, name, &text).await;
        debug!("Relayed message from {} to {} client(s)", client_id, delivered);
    }
    Ok(())
}

/// Receive the next text frame
///
/// Returns `Ok(None)` on a close frame or end of stream. Ping, pong and
/// binary frames are skipped.
async fn next_text<St>(ws_receiver: &mut St) -> Result<Option<String>, AppError>
where
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result? {
            Message::Text(text) => return Ok(Some(text.to_string())),
            Message::Close(_) => {
                debug!("Received close frame");
                return Ok(None);
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Pong is handled automatically by tungstenite
            }
            _ => {
                debug!("Ignoring non-text frame");
            }
        }
    }
    Ok(None)
}

fn log_close(client_id: ClientId, name: Option<&str>, state: ConnectionState, e: &AppError) {
    let name = name.unwrap_or("<unnamed>");
    if e.is_disconnect() {
        info!("Client {} ('{}') disconnected while {}: {}", client_id, name, state, e);
    } else {
        error!("Connection error for {} ('{}') while {}: {}", client_id, name, state, e);
    }
}

fn not_found(path: &str) -> ErrorResponse {
    debug!("Rejecting upgrade on unknown path {}", path);
    let mut response = ErrorResponse::new(Some(format!("no relay endpoint at {}", path)));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
