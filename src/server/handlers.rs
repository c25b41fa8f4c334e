//! HTTP handlers for the bridge API.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::header::{self, HeaderName};
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::stream::StreamExt;
use serde_json::Value;

use super::api::{
    enriched_agents, metrics_summary, parse_channels, parse_log_lines, recent_sessions,
    system_overview, Agent, ChannelHealth, CommandResponse, HealthResponse, LogsQuery,
    MetricsSummary, Session, SessionsQuery, SystemOverview,
};
use super::error::ApiError;
use crate::bridge::{GatewayBridge, LogRelay, DEFAULT_IDLE_TIMEOUT};

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Gateway query facade.
    pub bridge: GatewayBridge,
    /// Idle window for `/api/logs/stream`.
    pub stream_idle_timeout: Duration,
}

impl AppState {
    #[must_use]
    pub fn new(bridge: GatewayBridge) -> Self {
        Self {
            bridge,
            stream_idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Set the log stream idle window (builder pattern).
    #[must_use]
    pub fn with_stream_idle_timeout(mut self, idle: Duration) -> Self {
        self.stream_idle_timeout = idle;
        self
    }
}

/// GET /api/health - Bridge and gateway health. Never fails.
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    match state.bridge.health().await {
        Ok(health) => Json(HealthResponse::ok(&health)),
        Err(e) => Json(HealthResponse::degraded(e.to_string())),
    }
}

/// GET /api/overview - Gateway, agents, sessions, channels, memory and
/// security in one document.
pub async fn get_overview(
    State(state): State<AppState>,
) -> Result<Json<SystemOverview>, ApiError> {
    let status = state.bridge.status().await?;
    let health = state.bridge.health().await?;
    let agents = state.bridge.agents().await?;
    Ok(Json(system_overview(&status, &health, &agents)))
}

/// GET /api/agents - Agents enriched with session and heartbeat data.
pub async fn list_agents(State(state): State<AppState>) -> Result<Json<Vec<Agent>>, ApiError> {
    let agents = state.bridge.agents().await?;
    let status = state.bridge.status().await?;
    Ok(Json(enriched_agents(&agents, &status)))
}

/// GET /api/agents/:id - A single enriched agent.
pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    let agents = state.bridge.agents().await?;
    let status = state.bridge.status().await?;

    enriched_agents(&agents, &status)
        .into_iter()
        .find(|a| a.id == agent_id)
        .map(Json)
        .ok_or(ApiError::NotFound("Agent"))
}

/// GET /api/sessions - Recent sessions, optionally for one agent.
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<SessionsQuery>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let status = state.bridge.status().await?;
    Ok(Json(recent_sessions(&status, query.agent_id.as_deref())))
}

/// GET /api/sessions/:id - A single recent session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let status = state.bridge.status().await?;

    recent_sessions(&status, None)
        .into_iter()
        .find(|s| s.session_id == session_id)
        .map(Json)
        .ok_or(ApiError::NotFound("Session"))
}

/// GET /api/channels - Per-account channel health.
pub async fn list_channels(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChannelHealth>>, ApiError> {
    let health = state.bridge.health().await?;
    Ok(Json(parse_channels(&health)))
}

/// GET /api/metrics - Summary counters.
pub async fn get_metrics(State(state): State<AppState>) -> Result<Json<MetricsSummary>, ApiError> {
    let status = state.bridge.status().await?;
    let health = state.bridge.health().await?;
    Ok(Json(metrics_summary(&status, &health)))
}

/// GET /api/models - Model list and model status.
pub async fn get_models(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let models = state.bridge.models_list().await?;
    let status = state.bridge.models_status().await?;
    Ok(Json(serde_json::json!({ "models": models, "status": status })))
}

/// GET /api/skills - Installed skills, empty when unavailable.
pub async fn get_skills(State(state): State<AppState>) -> Json<Value> {
    Json(state.bridge.skills().await)
}

/// GET /api/gateway - Gateway health.
pub async fn get_gateway(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.bridge.gateway_health().await?))
}

/// GET /api/logs - Recent log entries.
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Json<Value> {
    match state.bridge.recent_logs(query.effective_limit()).await {
        Ok(raw) => Json(Value::Array(parse_log_lines(&raw))),
        Err(e) => Json(serde_json::json!({ "error": e.to_string(), "entries": [] })),
    }
}

/// GET /api/logs/stream - SSE tail of `logs --follow`.
pub async fn get_logs_stream(State(state): State<AppState>) -> impl IntoResponse {
    let relay =
        LogRelay::new(state.bridge.log_stream_command()).idle_timeout(state.stream_idle_timeout);
    let events = relay
        .start()
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.payload())));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events),
    )
}

/// POST /api/cache/clear - Drop all cached gateway results.
pub async fn post_clear_cache(State(state): State<AppState>) -> Json<CommandResponse> {
    state.bridge.clear_cache();
    Json(CommandResponse::success("Cache cleared"))
}
