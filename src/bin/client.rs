//! WebSocket Text Relay - Client Entry Point
//!
//! Prompts for the server URL and a display name, then chats until the user
//! quits, the server goes away, or Ctrl-C.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use text_relay::address::{prompt_server_url, validate_server_url, MAX_URL_ATTEMPTS};
use text_relay::config::ClientArgs;
use text_relay::console::{prompt_name, spawn_stdin_lines};
use text_relay::{ClientError, Supervisor, SupervisorExit, WsEndpoint};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries the chat
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("text_relay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = ClientArgs::parse();

    match run(args).await {
        Ok(exit) if exit.is_failure() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: ClientArgs) -> Result<SupervisorExit, ClientError> {
    let mut input = spawn_stdin_lines();
    let mut stdout = tokio::io::stdout();

    let url = match &args.url {
        Some(url) => validate_server_url(url)?.to_string(),
        None => prompt_server_url(&mut input, &mut stdout, MAX_URL_ATTEMPTS).await?,
    };
    let name = match &args.name {
        Some(name) => name.trim().to_string(),
        None => prompt_name(&mut input, &mut stdout).await?,
    };

    let supervisor = Supervisor::new(url.clone(), args.retry_policy());
    let mut endpoint = WsEndpoint::new(url, name, &mut input, &mut stdout);

    let exit = tokio::select! {
        exit = supervisor.run(&mut endpoint) => exit,
        _ = tokio::signal::ctrl_c() => {
            info!("Client closed by the user");
            SupervisorExit::Interrupted
        }
    };

    Ok(exit)
}
