//! Client duplex pump
//!
//! Runs the sender (local input → server) and the receiver (server → local
//! output) of one connection concurrently. The first of the two to finish
//! decides the outcome; the other is dropped at its current await point and
//! performs no further socket I/O.

use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::command::{Command, HELP_TEXT};
use crate::console::write_line;

/// Upper bound on answering the server's close frame
const CLOSE_REPLY_TIMEOUT: Duration = Duration::from_secs(1);

/// How a pumped connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The user asked to leave (quit command or end of input)
    UserQuit,
    /// The server closed the connection with a close frame
    ServerClosed,
    /// The connection was lost without a closing handshake
    Disconnected,
}

impl PumpExit {
    /// Whether the user explicitly ended the session
    pub fn user_quit(self) -> bool {
        self == PumpExit::UserQuit
    }
}

/// Pump one connection until either side finishes
pub async fn run<S, W>(
    ws_stream: WebSocketStream<S>,
    input: &mut mpsc::Receiver<String>,
    output: &mut W,
) -> PumpExit
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: AsyncWrite + Unpin,
{
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let exit = tokio::select! {
        exit = send_loop(&mut ws_sender, input) => {
            debug!("Sender finished first: {:?}", exit);
            exit
        }
        exit = receive_loop(&mut ws_receiver, output) => {
            debug!("Receiver finished first: {:?}", exit);
            exit
        }
    };

    // Reading the server's close frame only queues our reply; flush it so
    // the closing handshake completes.
    if exit == PumpExit::ServerClosed {
        match timeout(CLOSE_REPLY_TIMEOUT, ws_sender.close()).await {
            Ok(Ok(())) => debug!("Close reply sent"),
            Ok(Err(e)) => debug!("Close reply not sent: {}", e),
            Err(_) => debug!("Timed out sending close reply"),
        }
    }

    exit
}

/// Forward local input lines to the server
async fn send_loop<Si>(ws_sender: &mut Si, input: &mut mpsc::Receiver<String>) -> PumpExit
where
    Si: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(line) = input.recv().await {
        match Command::parse(&line) {
            Command::Quit => {
                info!("Client closed by the user");
                let _ = ws_sender.close().await;
                return PumpExit::UserQuit;
            }
            Command::Help => info!("{}", HELP_TEXT),
            Command::Empty => {}
            Command::Chat(text) => {
                if let Err(e) = ws_sender.send(Message::Text(text.to_string())).await {
                    error!("Connection closed, cannot send messages: {}", e);
                    return PumpExit::Disconnected;
                }
            }
        }
    }

    info!("Input closed, leaving");
    let _ = ws_sender.close().await;
    PumpExit::UserQuit
}

/// Display every text frame from the server
async fn receive_loop<St, W>(ws_receiver: &mut St, output: &mut W) -> PumpExit
where
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                if let Err(e) = write_line(output, &text).await {
                    warn!("Failed to display message: {}", e);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Connection closed by the server");
                return PumpExit::ServerClosed;
            }
            Ok(_) => {}
            Err(e) => {
                info!("Connection lost: {}", e);
                return PumpExit::Disconnected;
            }
        }
    }

    info!("Connection lost");
    PumpExit::Disconnected
}
