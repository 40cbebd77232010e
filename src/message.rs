//! Wire protocol definitions
//!
//! The protocol is plain text over WebSocket text frames:
//! - first client frame: the display name, verbatim
//! - later client frames: chat text, verbatim
//! - server frames: `"{name}: {text}"` for relayed chat, plain text for notices
//!
//! There is no close message; either side closes the socket.

/// Notice sent to every connected client when the broker shuts down
pub const SHUTDOWN_NOTICE: &str = "Server shutting down. You will be disconnected.";

/// Server → Client queue item
///
/// Items are pushed into a connection's outbound queue and written to the
/// socket by that connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Send one text frame
    Text(String),
    /// Send a close frame and stop writing
    Close,
}

/// Format a relayed chat line
pub fn relay_line(sender_name: &str, text: &str) -> String {
    format!("{}: {}", sender_name, text)
}
