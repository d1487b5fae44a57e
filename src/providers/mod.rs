//! HTTP clients for the external embedding and AI search providers.
//!
//! Both providers speak the OpenAI-compatible wire format. Clients are
//! blocking and created once at start-up; the credential they hold is
//! read-only afterwards.

pub mod openai;

pub use openai::{OpenAiEmbeddings, OpenAiNewsSearch};

use reqwest::blocking::{Client, Response};
use serde_json::Value;
use std::time::Duration;

const USER_AGENT: &str = concat!("feedscout/", env!("CARGO_PKG_VERSION"));

/// Failure talking to a provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no API credential configured")]
    Unconfigured,

    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// HTTP status of the failed call, when the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Transport(format!("request timed out: {err}"))
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()?;
    Ok(client)
}

/// Check the status of a provider response and decode its JSON body.
pub(crate) fn read_json(resp: Response, provider: &str) -> Result<Value, ProviderError> {
    let status = resp.status();
    log::debug!("{provider}: {status}");

    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    Ok(resp.json::<Value>()?)
}

/// Pull a readable message out of an error body.
///
/// Providers usually answer `{"error": {"message": ...}}`, sometimes
/// `{"error": "..."}` or plain text.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        let error = v.get("error")?;
        error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .map(str::to_owned)
    });

    match message {
        Some(message) => message,
        None if body.trim().is_empty() => "empty error body".to_string(),
        None => body.trim().to_string(),
    }
}
