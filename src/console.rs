//! Terminal input and output for the client
//!
//! Standard input is read on its own OS thread for the lifetime of the
//! process and forwarded line by line over a channel. Prompts and the pump
//! all read from that channel, so dropping a pending read never loses a
//! line and never leaves a blocked read behind in the runtime.

use std::io::BufRead;
use std::thread;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ClientError;

/// Lines buffered between the stdin thread and the client
const INPUT_BUFFER_SIZE: usize = 64;

/// Start forwarding stdin lines
///
/// The channel closes when stdin reaches end of file or fails.
pub fn spawn_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(INPUT_BUFFER_SIZE);
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
        debug!("stdin reader finished");
    });
    rx
}

/// Ask for the display name; surrounding whitespace is dropped
pub async fn prompt_name<W>(
    input: &mut mpsc::Receiver<String>,
    output: &mut W,
) -> Result<String, ClientError>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(b"Enter your name: ").await?;
    output.flush().await?;
    let line = input.recv().await.ok_or(ClientError::InputClosed)?;
    Ok(line.trim().to_string())
}

/// Write one line and flush
pub async fn write_line<W>(output: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
