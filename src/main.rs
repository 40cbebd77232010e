//! WebSocket Text Relay - Broker Entry Point
//!
//! Binds the listener and runs the broker until Ctrl-C.

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use text_relay::config::ServerArgs;
use text_relay::Broker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional .env before reading flags
    let _ = dotenvy::dotenv();

    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=text_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("text_relay=info")),
        )
        .init();

    let args = ServerArgs::parse();

    let listener = TcpListener::bind(args.bind).await?;
    let addr = listener.local_addr()?;
    info!("Relay listening locally at ws://{}{}", addr, args.path);

    Broker::new(listener, args.path).run_until_ctrl_c().await?;

    info!("Relay stopped");
    Ok(())
}
