//! Server address validation and prompting

use std::sync::OnceLock;

use regex::Regex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::ClientError;

/// Invalid addresses accepted before giving up
pub const MAX_URL_ATTEMPTS: u32 = 3;

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^wss?://([a-zA-Z0-9.-]+)(:\d+)?(/[\w\-./?%&=]*)?$")
            .unwrap_or_else(|e| unreachable!("static URL pattern is valid: {e}"))
    })
}

/// Check `url` against `ws[s]://host[:port][/path]`
pub fn validate_server_url(url: &str) -> Result<&str, ClientError> {
    if url_pattern().is_match(url) {
        Ok(url)
    } else {
        Err(ClientError::InvalidUrl(url.to_string()))
    }
}

/// Ask for a server URL until a valid one is entered
///
/// Gives up with [`ClientError::UrlAttemptsExhausted`] after `max_attempts`
/// invalid entries, or [`ClientError::InputClosed`] if input ends first.
pub async fn prompt_server_url<W>(
    input: &mut mpsc::Receiver<String>,
    output: &mut W,
    max_attempts: u32,
) -> Result<String, ClientError>
where
    W: AsyncWrite + Unpin,
{
    for attempt in 1..=max_attempts {
        output
            .write_all(b"Enter the server URL (e.g. wss://...): ")
            .await?;
        output.flush().await?;

        let line = input.recv().await.ok_or(ClientError::InputClosed)?;
        let candidate = line.trim();
        match validate_server_url(candidate) {
            Ok(url) => return Ok(url.to_string()),
            Err(e) => warn!("{}. Attempt {} of {}.", e, attempt, max_attempts),
        }
    }
    Err(ClientError::UrlAttemptsExhausted {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ws_and_wss() {
        assert!(validate_server_url("wss://chat.example.com/ws").is_ok());
        assert!(validate_server_url("ws://localhost:8000").is_ok());
        assert!(validate_server_url("ws://127.0.0.1:8000/ws?room=a&x=1").is_ok());
    }

    #[test]
    fn test_rejects_other_inputs() {
        for url in ["http://x", "not-a-url", "ws://", "wss://host:port", "ws://a b"] {
            assert!(
                matches!(validate_server_url(url), Err(ClientError::InvalidUrl(_))),
                "{:?}",
                url
            );
        }
    }

    #[tokio::test]
    async fn test_prompt_returns_first_valid() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send("http://x".to_string()).await.unwrap();
        tx.send(" ws://localhost:8000 ".to_string()).await.unwrap();
        let mut output = Vec::new();

        let url = prompt_server_url(&mut rx, &mut output, MAX_URL_ATTEMPTS)
            .await
            .unwrap();

        assert_eq!(url, "ws://localhost:8000");
        let shown = String::from_utf8(output).unwrap();
        assert_eq!(shown.matches("Enter the server URL").count(), 2);
    }

    #[tokio::test]
    async fn test_prompt_exhausts_after_three_attempts() {
        let (tx, mut rx) = mpsc::channel(8);
        for bad in ["http://x", "not-a-url", "ftp://y", "ws://localhost:8000"] {
            tx.send(bad.to_string()).await.unwrap();
        }
        let mut output = Vec::new();

        let result = prompt_server_url(&mut rx, &mut output, MAX_URL_ATTEMPTS).await;

        assert!(matches!(
            result,
            Err(ClientError::UrlAttemptsExhausted { attempts: 3 })
        ));
        // The fourth (valid) line was never consumed
        assert_eq!(rx.recv().await.as_deref(), Some("ws://localhost:8000"));
    }

    #[tokio::test]
    async fn test_prompt_input_closed() {
        let (tx, mut rx) = mpsc::channel::<String>(1);
        drop(tx);
        let mut output = Vec::new();

        let result = prompt_server_url(&mut rx, &mut output, MAX_URL_ATTEMPTS).await;

        assert!(matches!(result, Err(ClientError::InputClosed)));
    }
}
