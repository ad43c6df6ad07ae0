//! Ambient credentials from the GCE / Cloud Run metadata server.

use async_trait::async_trait;
use reqwest::Client;

use super::service_account::parse_token_response;
use super::token::{TokenCache, TokenProvider};
use crate::transport::TransportError;
use crate::{Error, ErrorContext, Result};

const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
const PROJECT_ID_PATH: &str = "/computeMetadata/v1/project/project-id";

pub struct MetadataTokenProvider {
    base_url: String,
    http: Client,
    cache: TokenCache,
}

impl MetadataTokenProvider {
    /// Honors `GCE_METADATA_HOST` the way Google's client libraries do.
    pub fn new(http: Client) -> Self {
        let host = std::env::var("GCE_METADATA_HOST")
            .unwrap_or_else(|_| DEFAULT_METADATA_HOST.to_string());
        Self::with_base_url(format!("http://{}", host), http)
    }

    pub fn with_base_url(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            cache: TokenCache::new(),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .header("Metadata-Flavor", "Google")
    }

    /// Project the ambient identity belongs to.
    pub async fn project_id(&self) -> Result<String> {
        let response = self.get(PROJECT_ID_PATH).send().await.map_err(|e| {
            Error::credential_with_context(
                "metadata server is unreachable",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("credentials"),
            )
        })?;

        let status = response.status();
        let text = response.text().await.map_err(TransportError::from)?;
        if !status.is_success() || text.trim().is_empty() {
            return Err(Error::credential_with_context(
                "metadata server did not return a project id",
                ErrorContext::new()
                    .with_details(format!("HTTP {}", status.as_u16()))
                    .with_source("credentials"),
            ));
        }
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    async fn access_token(&self) -> Result<String> {
        self.cache
            .get_or_fetch(|| async {
                let body = crate::transport::send_json("metadata", self.get(TOKEN_PATH)).await?;
                parse_token_response(&body, "metadata")
            })
            .await
    }

    async fn invalidate(&self) {
        self.cache.clear().await;
    }

    fn name(&self) -> &'static str {
        "metadata"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_project_id_and_token() {
        let mut server = mockito::Server::new_async().await;
        let project = server
            .mock("GET", PROJECT_ID_PATH)
            .match_header("metadata-flavor", "Google")
            .with_status(200)
            .with_body("quiz-prod")
            .create_async()
            .await;
        let token = server
            .mock("GET", TOKEN_PATH)
            .match_header("metadata-flavor", "Google")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"ya29.ambient","expires_in":3599,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let provider = MetadataTokenProvider::with_base_url(server.url(), Client::new());
        assert_eq!(provider.project_id().await.unwrap(), "quiz-prod");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.ambient");
        // second call is served from cache
        assert_eq!(provider.access_token().await.unwrap(), "ya29.ambient");

        project.assert_async().await;
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_project_is_credential_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", PROJECT_ID_PATH)
            .with_status(404)
            .create_async()
            .await;

        let provider = MetadataTokenProvider::with_base_url(server.url(), Client::new());
        let err = provider.project_id().await.unwrap_err();
        assert!(matches!(err, Error::UnreachableCredential { .. }));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("GET", TOKEN_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"ya29.ambient","expires_in":3599}"#)
            .expect(2)
            .create_async()
            .await;

        let provider = MetadataTokenProvider::with_base_url(server.url(), Client::new());
        provider.access_token().await.unwrap();
        provider.invalidate().await;
        provider.access_token().await.unwrap();

        token.assert_async().await;
    }
}
