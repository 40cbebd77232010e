//! Broker: accept loop and graceful shutdown
//!
//! Owns the TCP listener and the one [`Registry`] shared by every
//! connection handler it spawns.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::handler::handle_connection;
use crate::message::SHUTDOWN_NOTICE;
use crate::registry::Registry;

/// How long shutdown waits for handlers to flush their close frames
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// The relay broker
pub struct Broker {
    listener: TcpListener,
    registry: Registry,
    path: Arc<str>,
}

impl Broker {
    /// Create a broker serving WebSocket upgrades on `path`
    pub fn new(listener: TcpListener, path: impl Into<Arc<str>>) -> Self {
        Self {
            listener,
            registry: Registry::new(),
            path: path.into(),
        }
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the broker's registry
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// On shutdown every registered client gets [`SHUTDOWN_NOTICE`] and a
    /// close frame; the registry is left empty.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send,
    {
        let Broker {
            listener,
            registry,
            path,
        } = self;
        let mut handlers = JoinSet::new();
        tokio::pin!(shutdown);

        info!("Broker started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &registry, &path, &mut handlers);
                }
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = joined {
                        error!("Connection task failed: {}", e);
                    }
                }
            }
        }

        info!("Broker shutting down");
        registry.close_all(SHUTDOWN_NOTICE).await;

        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while handlers.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("{} connection(s) still open after grace period", handlers.len());
            handlers.abort_all();
        }

        Ok(())
    }

    /// Accept connections until Ctrl-C
    pub async fn run_until_ctrl_c(self) -> Result<(), AppError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to install Ctrl-C handler: {}", e);
            }
        })
        .await
    }
}

fn handle_accept_result(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    registry: &Registry,
    path: &Arc<str>,
    handlers: &mut JoinSet<()>,
) {
    match result {
        Ok((stream, addr)) => {
            debug!("New connection from {}", addr);
            let registry = registry.clone();
            let path = Arc::clone(path);

            // Spawn handler task for each connection
            handlers.spawn(async move {
                if let Err(e) = handle_connection(stream, registry, path).await {
                    debug!("Connection handler for {} ended with error: {}", addr, e);
                }
            });
        }
        Err(e) => {
            error!("Failed to accept connection: {}", e);
        }
    }
}
