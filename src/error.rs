//! Error types for the relay
//!
//! Server-side connection errors, client-side supervisor errors, and
//! outbound queue errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Server-side errors
///
/// All of these end the affected connection only; the broker keeps running.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Whether this error is the remote end going away rather than a fault
    pub fn is_disconnect(&self) -> bool {
        match self {
            AppError::WebSocket(err) => is_closed_error(err),
            AppError::Io(err) => is_disconnect_io(err),
        }
    }
}

/// Client-side errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server address does not match `ws[s]://host[:port][/path]`
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// Too many invalid server addresses entered
    #[error("Invalid server URL, {attempts} attempts exhausted")]
    UrlAttemptsExhausted { attempts: u32 },

    /// WebSocket protocol or connect error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Local input ended before a value was read
    #[error("Input closed")]
    InputClosed,
}

impl ClientError {
    /// Transient network failures (connection refused, reset, ...)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::WebSocket(tungstenite::Error::Io(_))
        )
    }

    /// The server closed the connection gracefully
    pub fn is_closed(&self) -> bool {
        match self {
            ClientError::WebSocket(err) => matches!(
                err,
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed
            ),
            _ => false,
        }
    }
}

/// Outbound queue errors
///
/// Enqueueing never waits, so a slow reader drops the item instead of
/// stalling the sender.
#[derive(Debug, Error)]
pub enum SendError {
    /// The connection's queue is at capacity
    #[error("Queue full")]
    QueueFull,

    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

fn is_closed_error(err: &tungstenite::Error) -> bool {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => true,
        tungstenite::Error::Protocol(
            tungstenite::error::ProtocolError::ResetWithoutClosingHandshake,
        ) => true,
        tungstenite::Error::Io(err) => is_disconnect_io(err),
        _ => false,
    }
}

fn is_disconnect_io(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        err.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_refused_is_retryable() {
        let err = ClientError::from(tungstenite::Error::Io(IoError::from(
            ErrorKind::ConnectionRefused,
        )));
        assert!(err.is_retryable());
        assert!(!err.is_closed());
    }

    #[test]
    fn test_closed_is_not_retryable() {
        let err = ClientError::from(tungstenite::Error::ConnectionClosed);
        assert!(err.is_closed());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_invalid_url_is_unexpected() {
        let err = ClientError::InvalidUrl("http://x".to_string());
        assert!(!err.is_retryable());
        assert!(!err.is_closed());
    }

    #[test]
    fn test_server_disconnect_classification() {
        assert!(AppError::from(tungstenite::Error::ConnectionClosed).is_disconnect());
        assert!(AppError::from(IoError::from(ErrorKind::ConnectionReset)).is_disconnect());
        assert!(!AppError::from(IoError::from(ErrorKind::PermissionDenied)).is_disconnect());
    }
}
