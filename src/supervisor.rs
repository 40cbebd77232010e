//! Client connection supervisor
//!
//! Connects, announces the display name, pumps the connection, and decides
//! after each attempt whether to reconnect, stop, or give up:
//!
//! - transient network failures are retried after a fixed delay, up to
//!   `max_retries` consecutive failures; a successful connect resets the count
//! - an abrupt disconnect mid-session reconnects right away
//! - a user quit, a graceful server close, or any unexpected error stops

use std::ops::ControlFlow;
use std::time::Duration;

use futures_util::SinkExt;
use tokio::io::AsyncWrite;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{error, info, warn};

use crate::error::ClientError;
use crate::pump::{self, PumpExit};

/// Consecutive connection failures tolerated by default
pub const MAX_RETRIES: u32 = 3;

/// Default pause between connection attempts
pub const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Retry limits for the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive failures before giving up
    pub max_retries: u32,
    /// Pause after each failure
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            delay: RETRY_DELAY,
        }
    }
}

/// Why the supervisor stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The user ended the session
    UserQuit,
    /// The server closed the connection gracefully
    ServerClosed,
    /// The server could not be reached `attempts` times in a row
    Unavailable { attempts: u32 },
    /// An unexpected error ended the session
    Failed(String),
    /// Interrupted from the terminal (Ctrl-C)
    Interrupted,
}

impl SupervisorExit {
    /// Whether the process should report failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SupervisorExit::Unavailable { .. } | SupervisorExit::Failed(_)
        )
    }
}

/// A server the supervisor can connect to and run sessions against
#[allow(async_fn_in_trait)]
pub trait Endpoint {
    /// An established connection
    type Conn;

    /// Open a new connection
    async fn connect(&mut self) -> Result<Self::Conn, ClientError>;

    /// Announce the identity and pump `conn` until it ends
    async fn run_session(&mut self, conn: Self::Conn) -> Result<PumpExit, ClientError>;
}

/// Retry loop around one endpoint
#[derive(Debug, Clone)]
pub struct Supervisor {
    url: String,
    policy: RetryPolicy,
}

impl Supervisor {
    /// Create a supervisor for `url` (used for logging)
    pub fn new(url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
        }
    }

    /// Run sessions against `endpoint` until one of the stop conditions
    pub async fn run<E: Endpoint>(&self, endpoint: &mut E) -> SupervisorExit {
        let mut retries = 0;

        while retries < self.policy.max_retries {
            let conn = match endpoint.connect().await {
                Ok(conn) => {
                    retries = 0;
                    conn
                }
                Err(e) => match self.on_error(e, &mut retries).await {
                    ControlFlow::Continue(()) => continue,
                    ControlFlow::Break(exit) => return exit,
                },
            };

            match endpoint.run_session(conn).await {
                Ok(PumpExit::UserQuit) => return SupervisorExit::UserQuit,
                Ok(PumpExit::ServerClosed) => {
                    warn!("Connection closed by the server");
                    return SupervisorExit::ServerClosed;
                }
                Ok(PumpExit::Disconnected) => {
                    info!("Connection to {} lost, reconnecting", self.url);
                }
                Err(e) => {
                    if let ControlFlow::Break(exit) = self.on_error(e, &mut retries).await {
                        return exit;
                    }
                }
            }
        }

        error!(
            "Server unavailable at {} after {} attempts",
            self.url, self.policy.max_retries
        );
        SupervisorExit::Unavailable {
            attempts: self.policy.max_retries,
        }
    }

    /// Classify a failure: back off and retry, or stop
    async fn on_error(
        &self,
        e: ClientError,
        retries: &mut u32,
    ) -> ControlFlow<SupervisorExit> {
        if e.is_retryable() {
            *retries += 1;
            warn!(
                "Could not connect ({}). Retrying in {:?} ({}/{})",
                e, self.policy.delay, retries, self.policy.max_retries
            );
            tokio::time::sleep(self.policy.delay).await;
            ControlFlow::Continue(())
        } else if e.is_closed() {
            warn!("Connection closed by the server");
            ControlFlow::Break(SupervisorExit::ServerClosed)
        } else {
            error!("Unexpected error: {}", e);
            ControlFlow::Break(SupervisorExit::Failed(e.to_string()))
        }
    }
}

/// WebSocket endpoint driven by terminal input and output
pub struct WsEndpoint<'a, W> {
    url: String,
    name: String,
    input: &'a mut mpsc::Receiver<String>,
    output: &'a mut W,
}

impl<'a, W> WsEndpoint<'a, W>
where
    W: AsyncWrite + Unpin,
{
    /// Create an endpoint for `url` announcing `name`
    pub fn new(
        url: impl Into<String>,
        name: impl Into<String>,
        input: &'a mut mpsc::Receiver<String>,
        output: &'a mut W,
    ) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            input,
            output,
        }
    }
}

impl<W> Endpoint for WsEndpoint<'_, W>
where
    W: AsyncWrite + Unpin,
{
    type Conn = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn connect(&mut self) -> Result<Self::Conn, ClientError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        Ok(ws_stream)
    }

    async fn run_session(&mut self, mut conn: Self::Conn) -> Result<PumpExit, ClientError> {
        // Identity first
        conn.send(Message::Text(self.name.clone())).await?;
        info!("Connected to {}. You can start chatting.", self.url);

        Ok(pump::run(conn, &mut *self.input, &mut *self.output).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::{Error as IoError, ErrorKind};

    use tokio_tungstenite::tungstenite;

    /// Scripted endpoint: connect results and session results in order
    #[derive(Default)]
    struct Scripted {
        connects: VecDeque<Result<(), ClientError>>,
        sessions: VecDeque<Result<PumpExit, ClientError>>,
        connect_calls: u32,
        session_calls: u32,
    }

    impl Scripted {
        fn refused() -> Result<(), ClientError> {
            Err(ClientError::from(tungstenite::Error::Io(IoError::from(
                ErrorKind::ConnectionRefused,
            ))))
        }
    }

    impl Endpoint for Scripted {
        type Conn = ();

        async fn connect(&mut self) -> Result<(), ClientError> {
            self.connect_calls += 1;
            self.connects.pop_front().unwrap_or_else(Self::refused)
        }

        async fn run_session(&mut self, _conn: ()) -> Result<PumpExit, ClientError> {
            self.session_calls += 1;
            self.sessions
                .pop_front()
                .unwrap_or(Ok(PumpExit::Disconnected))
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_user_quit_stops_without_retry() {
        let mut endpoint = Scripted {
            connects: VecDeque::from([Ok(())]),
            sessions: VecDeque::from([Ok(PumpExit::UserQuit)]),
            ..Default::default()
        };

        let exit = Supervisor::new("ws://test", fast_policy()).run(&mut endpoint).await;

        assert_eq!(exit, SupervisorExit::UserQuit);
        assert_eq!(endpoint.connect_calls, 1);
    }

    #[tokio::test]
    async fn test_success_resets_retry_counter() {
        // Two refusals, a session that drops, two more refusals, then a quit.
        // Without the reset this would exhaust three retries.
        let mut endpoint = Scripted {
            connects: VecDeque::from([
                Scripted::refused(),
                Scripted::refused(),
                Ok(()),
                Scripted::refused(),
                Scripted::refused(),
                Ok(()),
            ]),
            sessions: VecDeque::from([Ok(PumpExit::Disconnected), Ok(PumpExit::UserQuit)]),
            ..Default::default()
        };

        let exit = Supervisor::new("ws://test", fast_policy()).run(&mut endpoint).await;

        assert_eq!(exit, SupervisorExit::UserQuit);
        assert_eq!(endpoint.connect_calls, 6);
        assert_eq!(endpoint.session_calls, 2);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_unavailable() {
        let mut endpoint = Scripted::default();

        let exit = Supervisor::new("ws://test", fast_policy()).run(&mut endpoint).await;

        assert_eq!(exit, SupervisorExit::Unavailable { attempts: 3 });
        assert!(exit.is_failure());
        assert_eq!(endpoint.connect_calls, 3);
        assert_eq!(endpoint.session_calls, 0);
    }

    #[tokio::test]
    async fn test_server_close_stops() {
        let mut endpoint = Scripted {
            connects: VecDeque::from([Ok(())]),
            sessions: VecDeque::from([Ok(PumpExit::ServerClosed)]),
            ..Default::default()
        };

        let exit = Supervisor::new("ws://test", fast_policy()).run(&mut endpoint).await;

        assert_eq!(exit, SupervisorExit::ServerClosed);
        assert_eq!(endpoint.connect_calls, 1);
    }

    #[tokio::test]
    async fn test_closed_ok_during_identity_stops() {
        let mut endpoint = Scripted {
            connects: VecDeque::from([Ok(())]),
            sessions: VecDeque::from([Err(ClientError::from(
                tungstenite::Error::ConnectionClosed,
            ))]),
            ..Default::default()
        };

        let exit = Supervisor::new("ws://test", fast_policy()).run(&mut endpoint).await;

        assert_eq!(exit, SupervisorExit::ServerClosed);
        assert_eq!(endpoint.connect_calls, 1);
    }

    #[tokio::test]
    async fn test_unexpected_error_stops() {
        let mut endpoint = Scripted {
            connects: VecDeque::from([Err(ClientError::InvalidUrl("ws://?".to_string()))]),
            ..Default::default()
        };

        let exit = Supervisor::new("ws://test", fast_policy()).run(&mut endpoint).await;

        assert!(matches!(exit, SupervisorExit::Failed(_)));
        assert_eq!(endpoint.connect_calls, 1);
    }

    #[tokio::test]
    async fn test_disconnect_reconnects_immediately() {
        let mut endpoint = Scripted {
            connects: VecDeque::from([Ok(()), Ok(())]),
            sessions: VecDeque::from([Ok(PumpExit::Disconnected), Ok(PumpExit::UserQuit)]),
            ..Default::default()
        };

        let exit = Supervisor::new("ws://test", fast_policy()).run(&mut endpoint).await;

        assert_eq!(exit, SupervisorExit::UserQuit);
        assert_eq!(endpoint.connect_calls, 2);
    }
}
