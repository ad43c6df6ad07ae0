//! HTTP boundary.
//!
//! Routes:
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/health` | liveness probe |
//! | POST | `/api/explain-exam` | [`ExplanationService`] |
//! | POST | `/api/paypal/create-order` | [`PaymentService::create_order`] |
//! | POST | `/api/paypal/capture-order` | [`PaymentService::capture_order`] |
//!
//! Collaborators that fail to initialize are left out of [`AppState`]; the
//! routes that need them answer 500 while the rest keep working.

mod error;
mod middleware;
mod routes;

pub use error::{ApiError, ErrorBody, EXPLAIN_FAILURE};
pub use middleware::{caller_address, log_request};
pub use routes::{HealthResponse, SOURCE_HEADER};

use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::credentials::{self, Credentials, StaticTokenProvider};
use crate::explain::ExplanationService;
use crate::genai::{GeminiClient, GenerationConfig, TextGenerator};
use crate::payments::{PayPalClient, PaymentClient, PaymentService};
use crate::store::{ExplanationStore, FirestoreStore};

/// Project id used against the Firestore emulator when none is configured.
const EMULATOR_PROJECT: &str = "demo-explainer";

#[derive(Clone)]
pub struct AppState {
    pub explanations: Arc<ExplanationService>,
    pub payments: Arc<PaymentService>,
}

impl AppState {
    pub fn new(explanations: ExplanationService, payments: PaymentService) -> Self {
        Self {
            explanations: Arc::new(explanations),
            payments: Arc::new(payments),
        }
    }

    /// Wire every collaborator the configuration allows. Never fails: a
    /// collaborator that cannot start is logged and left absent.
    pub async fn from_config(config: &ServiceConfig, http: reqwest::Client) -> Self {
        let store = build_store(config, http.clone()).await;

        let generator: Option<Arc<dyn TextGenerator>> = match &config.gemini_api_key {
            Some(key) => Some(Arc::new(
                GeminiClient::new(key.clone(), http.clone()).with_generation_config(GenerationConfig {
                    temperature: config.gemini_temperature,
                    max_output_tokens: config.gemini_max_output_tokens,
                    json_response: true,
                }),
            )),
            None => {
                warn!("GEMINI_API_KEY not set; explanation generation disabled");
                None
            }
        };

        let payment_client: Option<Arc<dyn PaymentClient>> = match &config.paypal {
            Some(creds) => {
                info!(mode = ?config.deployment_mode, "PayPal client configured");
                Some(Arc::new(PayPalClient::new(creds.clone(), config.deployment_mode, http)))
            }
            None => {
                warn!("PayPal credentials not set; payment routes disabled");
                None
            }
        };

        Self::new(
            ExplanationService::new(store, generator, config.gemini_models.clone()),
            PaymentService::new(payment_client),
        )
    }
}

async fn build_store(config: &ServiceConfig, http: reqwest::Client) -> Option<Arc<dyn ExplanationStore>> {
    if let Some(host) = &config.firestore_emulator_host {
        let project_id = match &config.credential_source {
            credentials::CredentialSource::Ambient { project_id: Some(id) } => id.clone(),
            _ => EMULATOR_PROJECT.to_string(),
        };
        info!(%host, %project_id, "using Firestore emulator");
        let creds = Credentials {
            project_id,
            tokens: Arc::new(StaticTokenProvider::new("owner")),
        };
        let store = FirestoreStore::new(creds, &config.explanations_collection, http)
            .with_base_url(format!("http://{}", host.trim_end_matches('/')));
        return Some(Arc::new(store));
    }

    match credentials::bootstrap(&config.credential_source, http.clone()).await {
        Ok(creds) => {
            info!(
                project_id = %creds.project_id,
                source = config.credential_source.kind(),
                provider = creds.tokens.name(),
                "document store credentials loaded"
            );
            Some(Arc::new(FirestoreStore::new(
                creds,
                &config.explanations_collection,
                http,
            )))
        }
        Err(e) => {
            warn!(
                error = %e,
                source = config.credential_source.kind(),
                "document store unavailable; explanation requests will fail"
            );
            None
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/explain-exam", post(routes::explain_exam))
        .route("/api/paypal/create-order", post(routes::create_order))
        .route("/api/paypal/capture-order", post(routes::capture_order))
        .layer(axum::middleware::from_fn(log_request))
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl-C or SIGTERM.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "HTTP server listening");
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
