//! # explainer-gateway
//!
//! Backend for an exam-practice front-end: generates per-question answer
//! explanations with a generative model, caches them per exam in a document
//! store, and proxies payment order creation and capture to PayPal.
//!
//! ## Overview
//!
//! An exam is explained once. The first request for an `examId` builds a
//! single prompt for every question, runs it through an ordered list of
//! models until one returns parseable JSON, and stores the result. Every
//! later request for that exam is served from the store without touching a
//! model.
//!
//! Payments are a thin pass-through: input is validated, forwarded to the
//! provider and the provider's answer is returned. Nothing is persisted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use explainer_gateway::{config::ServiceConfig, server, transport};
//!
//! #[tokio::main]
//! async fn main() -> explainer_gateway::Result<()> {
//!     let config = ServiceConfig::from_env()?;
//!     let http = transport::build_client()?;
//!     let state = server::AppState::from_config(&config, http).await;
//!
//!     let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
//!     server::serve(listener, state).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Environment configuration |
//! | [`credentials`] | Service-account and metadata-server token providers |
//! | [`explain`] | Cache-or-generate orchestration and model fallback |
//! | [`genai`] | Text generation clients (Gemini) |
//! | [`store`] | Explanation persistence (Firestore, in-memory) |
//! | [`payments`] | Order creation and capture (PayPal) |
//! | [`server`] | axum routes, error mapping and access logging |
//! | [`logging`] | Subscriber setup and payload redaction |
//! | [`transport`] | Shared HTTP client and JSON response handling |
//! | [`types`] | Request, record and order types |

pub mod config;
pub mod credentials;
pub mod explain;
pub mod genai;
pub mod logging;
pub mod payments;
pub mod server;
pub mod store;
pub mod transport;
pub mod types;

pub use explain::ExplanationService;
pub use payments::PaymentService;
pub use types::{ExplanationRecord, ExplanationRequest, Explanations, Question};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
