use crate::{Error, Result};
use reqwest::Proxy;
use serde_json::Value;
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Build the process-wide HTTP client shared by every outbound collaborator.
///
/// Defaults are env-overridable: `HTTP_TIMEOUT_SECS`, `HTTP_POOL_MAX_IDLE_PER_HOST`,
/// `HTTP_POOL_IDLE_TIMEOUT_SECS` and `HTTP_PROXY_URL`.
pub fn build_client() -> Result<reqwest::Client> {
    let timeout_secs = env_parse("HTTP_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);

    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(env_parse("HTTP_POOL_MAX_IDLE_PER_HOST").unwrap_or(32))
        .pool_idle_timeout(Some(Duration::from_secs(
            env_parse("HTTP_POOL_IDLE_TIMEOUT_SECS").unwrap_or(90),
        )));

    if let Ok(proxy_url) = env::var("HTTP_PROXY_URL") {
        if let Ok(proxy) = Proxy::all(&proxy_url) {
            builder = builder.proxy(proxy);
        }
    }

    builder
        .build()
        .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}

/// Send a request and decode a JSON body, turning non-2xx answers into
/// [`Error::Provider`] with the provider's own message.
pub async fn send_json(provider: &str, request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await.map_err(TransportError::from)?;
    read_json(provider, response).await
}

pub async fn read_json(provider: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await.map_err(TransportError::from)?;

    if !status.is_success() {
        return Err(Error::provider(
            provider,
            Some(status.as_u16()),
            provider_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            }),
        ));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| {
        Error::provider(
            provider,
            Some(status.as_u16()),
            format!("invalid JSON response: {}", e),
        )
    })
}

/// Pull a human-readable message out of the common provider error shapes:
/// `{error: {message}}` (Google), `{message}` (PayPal orders),
/// `{error_description}` / `{error: "..."}` (OAuth2).
pub fn provider_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    json.pointer("/error/message")
        .or_else(|| json.get("message"))
        .or_else(|| json.get("error_description"))
        .or_else(|| json.get("error").filter(|v| v.is_string()))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

// Request URLs may carry credentials; they never reach error text.
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(e.without_url())
    }
}
