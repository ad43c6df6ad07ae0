//! Credential bootstrap for the document store.
//!
//! A service-account credential is loaded from the first available source:
//!
//! | Source | Configured by |
//! |--------|---------------|
//! | [`CredentialSource::Inline`] | `FIREBASE_SERVICE_ACCOUNT_JSON` |
//! | [`CredentialSource::File`] | `FIREBASE_SERVICE_ACCOUNT_PATH` or `GOOGLE_APPLICATION_CREDENTIALS` |
//! | [`CredentialSource::Ambient`] | nothing set; uses the metadata server |
//!
//! [`bootstrap`] resolves the source into a project id plus a
//! [`TokenProvider`]. Callers treat a failure as non-fatal: the service keeps
//! running without a document store.

mod metadata;
mod service_account;
mod token;

pub use metadata::MetadataTokenProvider;
pub(crate) use service_account::parse_token_response;
pub use service_account::{
    ServiceAccountKey, ServiceAccountTokenProvider, DATASTORE_SCOPE, DEFAULT_TOKEN_URI,
};
pub use token::{AccessToken, StaticTokenProvider, TokenCache, TokenProvider};

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone)]
pub enum CredentialSource {
    Inline(SecretString),
    File(PathBuf),
    Ambient { project_id: Option<String> },
}

impl CredentialSource {
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialSource::Inline(_) => "inline",
            CredentialSource::File(_) => "file",
            CredentialSource::Ambient { .. } => "ambient",
        }
    }
}

/// Resolved credentials: which project to talk to and how to authenticate.
#[derive(Clone)]
pub struct Credentials {
    pub project_id: String,
    pub tokens: Arc<dyn TokenProvider>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("project_id", &self.project_id)
            .field("tokens", &self.tokens.name())
            .finish()
    }
}

pub async fn bootstrap(source: &CredentialSource, http: reqwest::Client) -> Result<Credentials> {
    match source {
        CredentialSource::Inline(json) => from_key_json(json.expose_secret(), http),
        CredentialSource::File(path) => {
            let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                Error::credential_with_context(
                    "failed to read service account file",
                    ErrorContext::new()
                        .with_field_path(path.display().to_string())
                        .with_details(e.to_string())
                        .with_source("credentials"),
                )
            })?;
            from_key_json(&raw, http)
        }
        CredentialSource::Ambient { project_id } => {
            let provider = MetadataTokenProvider::new(http);
            let project_id = match project_id {
                Some(id) => id.clone(),
                None => provider.project_id().await?,
            };
            Ok(Credentials {
                project_id,
                tokens: Arc::new(provider),
            })
        }
    }
}

fn from_key_json(raw: &str, http: reqwest::Client) -> Result<Credentials> {
    let key = ServiceAccountKey::from_json(raw)?;
    let project_id = key
        .project_id
        .clone()
        .or_else(|| std::env::var("GOOGLE_CLOUD_PROJECT").ok())
        .ok_or_else(|| {
            Error::credential_with_context(
                "no project id in service account or GOOGLE_CLOUD_PROJECT",
                ErrorContext::new()
                    .with_field_path("project_id")
                    .with_source("credentials"),
            )
        })?;
    let provider = ServiceAccountTokenProvider::new(key, DATASTORE_SCOPE, http)?;
    Ok(Credentials {
        project_id,
        tokens: Arc::new(provider),
    })
}
