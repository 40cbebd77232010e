//! Minimal WebSocket Text Relay Library
//!
//! A broker that fans out plain-text lines between WebSocket clients, and a
//! terminal client that keeps a connection to it alive.
//!
//! # Protocol
//! - The first text frame a client sends is its display name, verbatim
//! - Every later frame is relayed to all other clients as `"{name}: {text}"`
//! - On shutdown the broker sends a notice and closes every connection
//!
//! # Architecture
//! Server side:
//! - `Registry` is the shared membership table, one per `Broker`, behind a
//!   single mutex; broadcast snapshots recipients and sends outside the lock
//! - Each connection runs a `handler` task plus a writer task draining that
//!   connection's outbound queue
//!
//! Client side:
//! - `pump` races a sender (stdin → server) against a receiver
//!   (server → stdout); the first to finish cancels the other
//! - `supervisor` reconnects on transient failures with a fixed delay and
//!   a bounded retry count
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use text_relay::Broker;
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8000").await.unwrap();
//!     Broker::new(listener, "/ws").run_until_ctrl_c().await.unwrap();
//! }
//! ```

pub mod address;
pub mod client;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod handler;
pub mod message;
pub mod pump;
pub mod registry;
pub mod server;
pub mod supervisor;
pub mod types;

// Re-export main types for convenience
pub use address::{prompt_server_url, validate_server_url};
pub use client::ClientRecord;
pub use command::Command;
pub use error::{AppError, ClientError, SendError};
pub use handler::{handle_connection, serve_connection};
pub use message::{Outbound, SHUTDOWN_NOTICE};
pub use pump::PumpExit;
pub use registry::Registry;
pub use server::Broker;
pub use supervisor::{Endpoint, RetryPolicy, Supervisor, SupervisorExit, WsEndpoint};
pub use types::{ClientId, ConnectionState};
