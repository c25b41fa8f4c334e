//! Bridge HTTP server with axum router and graceful shutdown.

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::ServerError;
use super::handlers::{
    get_agent, get_gateway, get_health, get_logs, get_logs_stream, get_metrics, get_models,
    get_overview, get_session, get_skills, list_agents, list_channels, list_sessions,
    post_clear_cache, AppState,
};
use crate::bridge::{GatewayBridge, ResultCache};
use crate::config::BridgeConfig;

/// HTTP server exposing the gateway to the dashboard.
pub struct BridgeServer {
    address: String,
    cors_origins: Vec<String>,
    state: AppState,
    cancel: CancellationToken,
}

impl BridgeServer {
    /// Create a server from configuration, owning a fresh result cache.
    #[must_use]
    pub fn from_config(config: &BridgeConfig) -> Self {
        let bridge = GatewayBridge::new(config.command_builder(), ResultCache::default().into())
            .with_settings(config.bridge_settings());
        let state = AppState::new(bridge).with_stream_idle_timeout(config.stream_idle_timeout());
        Self::new(config.address(), state).with_cors_origins(config.server.cors_origins.clone())
    }

    /// Create a server for the given address and state.
    #[must_use]
    pub fn new(address: impl Into<String>, state: AppState) -> Self {
        Self {
            address: address.into(),
            cors_origins: Vec::new(),
            state,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the allowed CORS origins (builder pattern).
    #[must_use]
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Token that stops the server when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Build the axum router with all routes and middleware.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::InvalidOrigin` if a CORS origin is not a valid
    /// header value.
    pub fn build_router(&self) -> Result<Router, ServerError> {
        let router = Router::new()
            .route("/api/health", get(get_health))
            .route("/api/overview", get(get_overview))
            .route("/api/agents", get(list_agents))
            .route("/api/agents/:id", get(get_agent))
            .route("/api/sessions", get(list_sessions))
            .route("/api/sessions/:id", get(get_session))
            .route("/api/channels", get(list_channels))
            .route("/api/metrics", get(get_metrics))
            .route("/api/models", get(get_models))
            .route("/api/skills", get(get_skills))
            .route("/api/gateway", get(get_gateway))
            .route("/api/logs", get(get_logs))
            .route("/api/logs/stream", get(get_logs_stream))
            .route("/api/cache/clear", post(post_clear_cache))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.cors_origins.is_empty() {
            return Ok(router);
        }
        Ok(router.layer(self.cors_layer()?))
    }

    fn cors_layer(&self) -> Result<CorsLayer, ServerError> {
        let origins = self
            .cors_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| ServerError::InvalidOrigin(origin.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true))
    }

    /// Run the server, binding to the configured address.
    ///
    /// The server will run until the cancellation token is triggered,
    /// at which point it will perform a graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or serve.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = self.build_router()?;
        let cancel = self.cancel.clone();

        tracing::info!(address = %self.address, "Starting bridge server");

        let listener =
            TcpListener::bind(&self.address)
                .await
                .map_err(|source| ServerError::BindError {
                    address: self.address.clone(),
                    source,
                })?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Bridge server shutting down gracefully");
            })
            .await?;
        Ok(())
    }
}
