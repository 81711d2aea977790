use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;

use crate::config::GatewayConfig;
use crate::gitsource::{DefaultGitSourceFactory, GitSourceFactory};
use crate::request_logging::log_gateway_request;
use crate::runservice::{RunCreator, RunserviceClient};
use crate::store::{ConfigStore, ConfigstoreClient};

pub mod api_types;
pub mod auth;
pub mod hierarchy;
pub mod identity;
pub mod ownership;
pub mod secrets;
pub mod shadowing;
pub mod webhook;

#[cfg(test)]
mod fakes;

use ownership::{Authorizer, StoreAuthorizer};

/// Collaborators shared by every request. Cloning is cheap.
#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<dyn ConfigStore>,
    pub authorizer: Arc<dyn Authorizer>,
    pub git_sources: Arc<dyn GitSourceFactory>,
    pub runs: Arc<dyn RunCreator>,
    pub webhook_body_limit: usize,
}

impl GatewayState {
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        let store: Arc<dyn ConfigStore> =
            Arc::new(ConfigstoreClient::new(&config.configstore_url()));

        Self {
            authorizer: Arc::new(StoreAuthorizer::new(Arc::clone(&store))),
            store,
            git_sources: Arc::new(DefaultGitSourceFactory),
            runs: Arc::new(RunserviceClient::new(&config.runservice_url())),
            webhook_body_limit: config.webhook_body_limit_bytes(),
        }
    }
}

#[must_use]
pub fn router(state: GatewayState) -> Router {
    let webhook_router = Router::new()
        .route("/webhooks", post(webhook::webhooks))
        .layer(DefaultBodyLimit::max(state.webhook_body_limit));

    let secrets_router = Router::new()
        .route(
            "/:parent_kind/:parent_ref/secrets",
            get(secrets::list_secrets).post(secrets::create_secret_handler),
        )
        .route(
            "/:parent_kind/:parent_ref/secrets/:secret_name",
            put(secrets::update_secret_handler).delete(secrets::delete_secret_handler),
        );

    Router::new()
        .merge(webhook_router)
        .nest("/api/v1alpha", secrets_router)
        .layer(middleware::from_fn(log_gateway_request))
        .with_state(state)
}

/// Serves the gateway until ctrl-c.
///
/// # Errors
///
/// Returns an error when the listener cannot be bound or the server fails.
pub async fn run(config: &GatewayConfig) -> Result<()> {
    let bind_address = config.bind_address();
    let app = router(GatewayState::from_config(config));
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!(
        bind_address = %bind_address,
        configstore_url = %config.configstore_url(),
        runservice_url = %config.runservice_url(),
        "gateway listening"
    );
    if let Some(webhook_base) = config.webhook_url("") {
        tracing::info!(webhook_base = %webhook_base, "webhook deliveries accepted");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
