//! Command line and environment configuration
//!
//! Both binaries load `.env` (if any) before parsing, so every flag with an
//! `env` name can also come from there.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::supervisor::{RetryPolicy, MAX_RETRIES};

/// Relay broker options
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Relay text messages between WebSocket clients", long_about = None)]
pub struct ServerArgs {
    /// Socket address to listen on
    #[arg(long, env = "RELAY_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Path the WebSocket endpoint is served on
    #[arg(long, env = "RELAY_PATH", default_value = "/ws")]
    pub path: String,
}

/// Relay client options
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Chat through a relay broker", long_about = None)]
pub struct ClientArgs {
    /// Server URL (ws:// or wss://); prompted for when omitted
    #[arg(long)]
    pub url: Option<String>,

    /// Display name; prompted for when omitted
    #[arg(long)]
    pub name: Option<String>,

    /// Consecutive connection failures before giving up
    #[arg(long, env = "RELAY_RETRIES", default_value_t = MAX_RETRIES)]
    pub retries: u32,

    /// Seconds to wait between connection attempts
    #[arg(long, env = "RELAY_RETRY_DELAY", default_value_t = 3)]
    pub retry_delay: u64,
}

impl ClientArgs {
    /// Retry policy from the flags
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retries,
            delay: Duration::from_secs(self.retry_delay),
        }
    }
}
