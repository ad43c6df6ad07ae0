use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use super::value::{decode_document, encode_fields, CREATED_AT};
use super::ExplanationStore;
use crate::credentials::{Credentials, TokenProvider};
use crate::transport::{read_json, send_json, TransportError};
use crate::types::ExplanationRecord;
use crate::{Error, Result};

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";
const PROVIDER: &str = "firestore";

/// Cloud Firestore backend speaking the v1 REST API.
pub struct FirestoreStore {
    base_url: String,
    project_id: String,
    collection: String,
    tokens: Arc<dyn TokenProvider>,
    http: Client,
}

impl FirestoreStore {
    pub fn new(credentials: Credentials, collection: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: FIRESTORE_BASE_URL.to_string(),
            project_id: credentials.project_id,
            collection: collection.into(),
            tokens: credentials.tokens,
            http,
        }
    }

    /// Point at another endpoint (emulator, mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn document_name(&self, exam_id: &str) -> String {
        format!("{}/{}/{}", self.database_path(), self.collection, exam_id)
    }

    fn document_url(&self, exam_id: &str) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| TransportError::Other(format!("invalid Firestore base URL: {}", e)))?;
        // Push segments one by one so ids containing reserved characters are escaped.
        url.path_segments_mut()
            .map_err(|_| TransportError::Other("Firestore base URL cannot be a base".into()))?
            .pop_if_empty()
            .push("v1")
            .extend(self.database_path().split('/'))
            .push(&self.collection)
            .push(exam_id);
        Ok(url)
    }

    fn commit_url(&self) -> String {
        format!("{}/v1/{}:commit", self.base_url, self.database_path())
    }

    /// A 401 means the cached token was revoked or expired early.
    async fn forget_rejected_token<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(Error::Provider { status: Some(401), .. }) = &result {
            warn!(provider = self.tokens.name(), "Firestore rejected the bearer token; dropping it");
            self.tokens.invalidate().await;
        }
        result
    }
}

#[async_trait]
impl ExplanationStore for FirestoreStore {
    async fn get(&self, exam_id: &str) -> Result<Option<ExplanationRecord>> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(self.document_url(exam_id)?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(TransportError::from)?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(exam_id, "explanation cache miss");
            return Ok(None);
        }
        let doc = self
            .forget_rejected_token(read_json(PROVIDER, response).await)
            .await?;
        decode_document(&doc).map(Some)
    }

    async fn put(&self, record: &ExplanationRecord) -> Result<()> {
        let token = self.tokens.access_token().await?;
        let body = json!({
            "writes": [{
                "update": {
                    "name": self.document_name(&record.exam_id),
                    "fields": encode_fields(record),
                },
                "updateTransforms": [{
                    "fieldPath": CREATED_AT,
                    "setToServerValue": "REQUEST_TIME",
                }],
            }],
        });

        let result = send_json(
            PROVIDER,
            self.http.post(self.commit_url()).bearer_auth(token).json(&body),
        )
        .await;
        self.forget_rejected_token(result).await?;
        debug!(exam_id = %record.exam_id, "explanation record written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "firestore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticTokenProvider;
    use crate::types::Explanations;
    use mockito::Matcher;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTokens {
        invalidated: AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for CountingTokens {
        async fn access_token(&self) -> Result<String> {
            Ok("stale".to_string())
        }

        async fn invalidate(&self) {
            self.invalidated.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn store(base_url: &str) -> FirestoreStore {
        let creds = Credentials {
            project_id: "quiz-test".to_string(),
            tokens: Arc::new(StaticTokenProvider::new("owner")),
        };
        FirestoreStore::new(creds, "exam_explanations", Client::new()).with_base_url(base_url)
    }

    const DOC_PATH: &str =
        "/v1/projects/quiz-test/databases/(default)/documents/exam_explanations/exam-1";

    #[tokio::test]
    async fn test_get_hit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", DOC_PATH)
            .match_header("authorization", "Bearer owner")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "name": "projects/quiz-test/databases/(default)/documents/exam_explanations/exam-1",
                    "fields": {
                        "examId": {"stringValue": "exam-1"},
                        "examTitle": {"stringValue": "Chemistry"},
                        "explanations": {"mapValue": {"fields": {"q1": {"stringValue": "H2O is water."}}}},
                        "createdAt": {"timestampValue": "2026-01-05T08:30:00Z"}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let record = store(&server.url()).get("exam-1").await.unwrap().unwrap();
        assert_eq!(record.exam_title, "Chemistry");
        assert_eq!(record.explanations["q1"], "H2O is water.");
        assert!(record.created_at.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_miss_on_404() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", DOC_PATH)
            .with_status(404)
            .with_body(r#"{"error":{"code":404,"message":"Document not found","status":"NOT_FOUND"}}"#)
            .create_async()
            .await;

        assert!(store(&server.url()).get("exam-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_permission_denied_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", DOC_PATH)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#)
            .create_async()
            .await;

        let err = store(&server.url()).get("exam-1").await.unwrap_err();
        match err {
            Error::Provider { status, message, .. } => {
                assert_eq!(status, Some(403));
                assert_eq!(message, "Missing or insufficient permissions.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_put_commits_with_server_timestamp() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/projects/quiz-test/databases/(default)/documents:commit")
            .match_header("authorization", "Bearer owner")
            .match_body(Matcher::Json(json!({
                "writes": [{
                    "update": {
                        "name": "projects/quiz-test/databases/(default)/documents/exam_explanations/exam-1",
                        "fields": {
                            "examId": {"stringValue": "exam-1"},
                            "examTitle": {"stringValue": "Chemistry"},
                            "explanations": {"mapValue": {"fields": {"q1": {"stringValue": "because"}}}}
                        }
                    },
                    "updateTransforms": [{"fieldPath": "createdAt", "setToServerValue": "REQUEST_TIME"}]
                }]
            })))
            .with_status(200)
            .with_body(r#"{"writeResults":[{"updateTime":"2026-01-05T08:30:00Z"}],"commitTime":"2026-01-05T08:30:00Z"}"#)
            .create_async()
            .await;

        let mut explanations = Explanations::new();
        explanations.insert("q1".into(), "because".into());
        store(&server.url())
            .put(&ExplanationRecord::new("exam-1", "Chemistry", explanations))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_drops_cached_token() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", DOC_PATH)
            .with_status(401)
            .with_body(r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#)
            .create_async()
            .await;

        let tokens = Arc::new(CountingTokens::default());
        let creds = Credentials {
            project_id: "quiz-test".to_string(),
            tokens: tokens.clone(),
        };
        let store = FirestoreStore::new(creds, "exam_explanations", Client::new()).with_base_url(server.url());

        let err = store.get("exam-1").await.unwrap_err();
        assert!(matches!(err, Error::Provider { status: Some(401), .. }));
        assert_eq!(tokens.invalidated.load(Ordering::SeqCst), 1);
    }
}
