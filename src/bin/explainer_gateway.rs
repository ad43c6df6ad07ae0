//! explainer-gateway: HTTP service entry point.
//!
//! All configuration comes from the environment; see `ServiceConfig`.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use explainer_gateway::config::ServiceConfig;
use explainer_gateway::logging::{self, Redacted};
use explainer_gateway::{server, transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("invalid configuration")?;
    logging::init(&config.log_level);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %Redacted(&config.summary()),
        "starting explainer-gateway"
    );

    let http = transport::build_client().context("failed to build HTTP client")?;
    let state = server::AppState::from_config(&config, http).await;

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    server::serve(listener, state)
        .await
        .context("HTTP server terminated")?;

    info!("explainer-gateway stopped");
    Ok(())
}
