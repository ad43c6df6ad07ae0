//! Service-account keys and the JWT-bearer token exchange.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::token::{AccessToken, TokenCache, TokenProvider};
use crate::transport::send_json;
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

const JWT_LIFETIME_SECONDS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The downloadable service-account JSON key (only the fields we use).
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: SecretString,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(raw).map_err(|e| {
            Error::credential_with_context(
                "service account JSON is malformed",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("credentials"),
            )
        })?;

        if let Some(kind) = key.key_type.as_deref() {
            if kind != "service_account" {
                return Err(Error::credential_with_context(
                    format!("unsupported credential type '{}'", kind),
                    ErrorContext::new()
                        .with_field_path("type")
                        .with_source("credentials"),
                ));
            }
        }
        Ok(key)
    }

    fn encoding_key(&self) -> Result<EncodingKey> {
        EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes()).map_err(|e| {
            Error::credential_with_context(
                "service account private key is not a valid RSA PEM",
                ErrorContext::new()
                    .with_field_path("private_key")
                    .with_details(e.to_string())
                    .with_source("credentials"),
            )
        })
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

/// Exchanges a self-signed RS256 assertion for an OAuth2 access token.
pub struct ServiceAccountTokenProvider {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    http: Client,
    cache: TokenCache,
}

impl ServiceAccountTokenProvider {
    /// Fails up front if the private key cannot be parsed.
    pub fn new(key: ServiceAccountKey, scope: impl Into<String>, http: Client) -> Result<Self> {
        let encoding_key = key.encoding_key()?;
        Ok(Self {
            key,
            encoding_key,
            scope: scope.into(),
            http,
            cache: TokenCache::new(),
        })
    }

    fn assertion(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            exp: now + JWT_LIFETIME_SECONDS,
            iat: now,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.encoding_key).map_err(|e| {
            Error::credential_with_context(
                "failed to sign token assertion",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("credentials"),
            )
        })
    }

    async fn exchange(&self) -> Result<AccessToken> {
        let assertion = self.assertion()?;
        let form = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];
        let body = send_json("google-oauth", self.http.post(&self.key.token_uri).form(&form)).await?;
        parse_token_response(&body, "google-oauth")
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String> {
        self.cache.get_or_fetch(|| self.exchange()).await
    }

    async fn invalidate(&self) {
        self.cache.clear().await;
    }

    fn name(&self) -> &'static str {
        "service_account"
    }
}

/// Decode the standard `{access_token, expires_in}` OAuth2 token response.
pub(crate) fn parse_token_response(body: &serde_json::Value, provider: &str) -> Result<AccessToken> {
    let token = body
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::provider(provider, None, "token response has no access_token"))?;
    let expires_in = body
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .unwrap_or(JWT_LIFETIME_SECONDS);
    Ok(AccessToken::new(token, expires_in))
}
