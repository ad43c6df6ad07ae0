//! Bearer tokens and the shared refresh-ahead cache.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::future::Future;
use tokio::sync::RwLock;
use tracing::debug;

use crate::Result;

/// Refresh this long before the provider-reported expiry.
const REFRESH_SKEW_SECS: i64 = 60;

#[derive(Clone)]
pub struct AccessToken {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_in_secs: i64) -> Self {
        Self {
            value: SecretString::new(value.into()),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        }
    }

    pub fn secret(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn needs_refresh(&self) -> bool {
        Utc::now() + Duration::seconds(REFRESH_SKEW_SECS) >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of OAuth2 bearer tokens for outbound calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current bearer token, fetching a fresh one when the cached one is near expiry.
    async fn access_token(&self) -> Result<String>;

    /// Drop any cached token so the next call fetches a fresh one.
    /// Called after the downstream API rejects a token with 401.
    async fn invalidate(&self) {}

    fn name(&self) -> &'static str;
}

/// Fixed token, for emulators and tests.
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.expose_secret().clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Single-slot token cache. Concurrent callers that find the slot stale
/// serialize on the write lock, so only one refresh goes out.
#[derive(Default)]
pub struct TokenCache {
    slot: RwLock<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken>>,
    {
        if let Some(token) = self.slot.read().await.as_ref() {
            if !token.needs_refresh() {
                return Ok(token.secret().to_string());
            }
        }

        let mut slot = self.slot.write().await;
        if let Some(token) = slot.as_ref() {
            if !token.needs_refresh() {
                return Ok(token.secret().to_string());
            }
        }

        let token = fetch().await?;
        debug!(expires_at = %token.expires_at(), "access token refreshed");
        let value = token.secret().to_string();
        *slot = Some(token);
        Ok(value)
    }

    pub async fn clear(&self) {
        *self.slot.write().await = None;
    }
}
