//! Response types and shaping of gateway JSON for the HTTP endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Service name reported by `/api/health`.
pub const SERVICE_NAME: &str = "openclaw-proxy";

/// Default number of log lines for `/api/logs`.
pub const DEFAULT_LOG_LIMIT: u32 = 100;

/// Upper bound on `/api/logs?limit=`.
pub const MAX_LOG_LIMIT: u32 = 500;

/// Response for GET /api/health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` when the gateway answered, `degraded` otherwise.
    pub status: String,
    pub service: String,
    pub openclaw: Value,
}

impl HealthResponse {
    /// Summarize a successful `openclaw health` document.
    #[must_use]
    pub fn ok(health: &Value) -> Self {
        Self {
            status: "ok".to_string(),
            service: SERVICE_NAME.to_string(),
            openclaw: serde_json::json!({
                "ok": health.get("ok").and_then(Value::as_bool).unwrap_or(false),
                "defaultAgentId": health.get("defaultAgentId"),
                "heartbeatSeconds": health.get("heartbeatSeconds"),
            }),
        }
    }

    #[must_use]
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            status: "degraded".to_string(),
            service: SERVICE_NAME.to_string(),
            openclaw: serde_json::json!({ "ok": false, "error": error.into() }),
        }
    }
}

/// Response for administrative endpoints (POST /api/cache/clear).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Whether the command was successful.
    pub success: bool,
    /// Message describing the result.
    pub message: String,
}

impl CommandResponse {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// An agent from `agents list`, enriched from `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Agent {
    pub id: String,
    pub identity_name: String,
    pub identity_emoji: String,
    pub workspace: String,
    pub agent_dir: String,
    pub model: String,
    pub bindings: i64,
    pub is_default: bool,
    pub routes: Vec<String>,
    pub sessions_count: i64,
    pub last_active_age_ms: Option<i64>,
    pub heartbeat_enabled: bool,
    pub heartbeat_every: String,
}

/// A recent session from `status.sessions.recent`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    pub agent_id: String,
    pub key: String,
    pub kind: String,
    pub session_id: String,
    pub updated_at: Option<i64>,
    pub age: Option<i64>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub remaining_tokens: Option<i64>,
    pub percent_used: Option<i64>,
    pub model: String,
    pub context_tokens: Option<i64>,
    pub flags: Vec<String>,
    pub system_sent: Option<bool>,
}

/// Gateway block of GET /api/overview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub mode: String,
    pub url: String,
    pub reachable: bool,
    pub connect_latency_ms: Option<i64>,
    pub host: String,
    pub ip: String,
    pub version: String,
    pub platform: String,
    pub service_installed: bool,
    pub service_running: String,
}

/// Memory index block of GET /api/overview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStatus {
    pub agent_id: String,
    pub backend: String,
    pub files: i64,
    pub chunks: i64,
    pub dirty: bool,
    pub vector_available: bool,
    pub fts_available: bool,
}

/// One finding of the gateway security audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityFinding {
    pub check_id: String,
    pub severity: String,
    pub title: String,
    pub detail: String,
    pub remediation: String,
}

/// Response for GET /api/overview: the whole system in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemOverview {
    pub gateway: GatewayStatus,
    pub agents: Vec<Agent>,
    pub sessions: Vec<Session>,
    pub channels: Vec<ChannelHealth>,
    pub memory: MemoryStatus,
    pub security: Vec<SecurityFinding>,
    pub os: Value,
    pub update: Value,
    pub total_sessions: i64,
    pub health_ok: bool,
}

/// One channel account as probed by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelHealth {
    pub name: String,
    pub channel_id: String,
    pub configured: bool,
    pub running: bool,
    pub probe_ok: Option<bool>,
    pub probe_elapsed_ms: Option<i64>,
    pub bot_username: Option<String>,
    pub bot_id: Option<String>,
    pub last_error: Option<String>,
    pub account_id: String,
}

/// Aggregated counters for GET /api/metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_agents: usize,
    pub total_sessions: i64,
    pub total_channels: usize,
    pub channels_healthy: usize,
    pub gateway_reachable: bool,
    pub gateway_latency_ms: i64,
    pub security_critical: i64,
    pub security_warnings: i64,
    pub memory_chunks: i64,
    pub memory_files: i64,
}

/// Query parameters for GET /api/logs.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_log_limit")]
    pub limit: u32,
}

fn default_log_limit() -> u32 {
    DEFAULT_LOG_LIMIT
}

impl LogsQuery {
    /// The limit clamped to `1..=MAX_LOG_LIMIT`.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_LOG_LIMIT)
    }
}

/// Query parameters for GET /api/sessions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionsQuery {
    pub agent_id: Option<String>,
}

fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}

fn object_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a Map<String, Value>> {
    value.pointer(pointer).and_then(Value::as_object)
}

fn i64_at(value: &Value, pointer: &str) -> i64 {
    value.pointer(pointer).and_then(Value::as_i64).unwrap_or(0)
}

fn str_at(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn bool_at(value: &Value, pointer: &str) -> bool {
    value.pointer(pointer).and_then(Value::as_bool).unwrap_or(false)
}

fn object_or_empty(value: &Value, pointer: &str) -> Value {
    value
        .pointer(pointer)
        .filter(|v| v.is_object())
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Decode gateway records into a typed model, skipping records that do not fit.
fn decode_all<T>(records: impl Iterator<Item = Value>, what: &str) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
{
    records
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed {what} record");
                None
            }
        })
        .collect()
}

/// Merge per-agent session and heartbeat data from `status` into an agent.
#[must_use]
pub fn enrich_agent(agent: &Value, status: &Value) -> Value {
    let Value::Object(mut fields) = agent.clone() else {
        return agent.clone();
    };
    let id = agent.get("id");

    if let Some(stats) = array_at(status, "/agents/agents")
        .iter()
        .find(|s| s.get("id") == id)
    {
        fields.insert(
            "sessionsCount".to_string(),
            stats.get("sessionsCount").cloned().unwrap_or(Value::from(0)),
        );
        fields.insert(
            "lastActiveAgeMs".to_string(),
            stats.get("lastActiveAgeMs").cloned().unwrap_or(Value::Null),
        );
    }

    if let Some(heartbeat) = array_at(status, "/heartbeat/agents")
        .iter()
        .find(|h| h.get("agentId") == id)
    {
        fields.insert(
            "heartbeatEnabled".to_string(),
            heartbeat.get("enabled").cloned().unwrap_or(Value::Bool(false)),
        );
        fields.insert(
            "heartbeatEvery".to_string(),
            heartbeat.get("every").cloned().unwrap_or_else(|| Value::from("")),
        );
    }

    Value::Object(fields)
}

/// Agents from `agents list`, enriched from `status` and typed.
#[must_use]
pub fn enriched_agents(agents: &Value, status: &Value) -> Vec<Agent> {
    let list = agents.as_array().map_or(&[][..], Vec::as_slice);
    decode_all(list.iter().map(|agent| enrich_agent(agent, status)), "agent")
}

/// Recent sessions from `status`, optionally filtered by agent.
#[must_use]
pub fn recent_sessions(status: &Value, agent_id: Option<&str>) -> Vec<Session> {
    let sessions: Vec<Session> =
        decode_all(array_at(status, "/sessions/recent").iter().cloned(), "session");
    sessions
        .into_iter()
        .filter(|s| agent_id.map_or(true, |id| s.agent_id == id))
        .collect()
}

/// Assemble the overview document from `status`, `health` and `agents list`.
#[must_use]
pub fn system_overview(status: &Value, health: &Value, agents: &Value) -> SystemOverview {
    let gateway = GatewayStatus {
        mode: str_at(status, "/gateway/mode"),
        url: str_at(status, "/gateway/url"),
        reachable: bool_at(status, "/gateway/reachable"),
        connect_latency_ms: status
            .pointer("/gateway/connectLatencyMs")
            .and_then(Value::as_i64),
        host: str_at(status, "/gateway/self/host"),
        ip: str_at(status, "/gateway/self/ip"),
        version: str_at(status, "/gateway/self/version"),
        platform: str_at(status, "/gateway/self/platform"),
        service_installed: bool_at(status, "/gatewayService/installed"),
        service_running: str_at(status, "/gatewayService/runtimeShort"),
    };

    let memory = MemoryStatus {
        agent_id: str_at(status, "/memory/agentId"),
        backend: str_at(status, "/memory/backend"),
        files: i64_at(status, "/memory/files"),
        chunks: i64_at(status, "/memory/chunks"),
        dirty: bool_at(status, "/memory/dirty"),
        vector_available: bool_at(status, "/memory/vector/available"),
        fts_available: bool_at(status, "/memory/fts/available"),
    };

    SystemOverview {
        gateway,
        agents: enriched_agents(agents, status),
        sessions: recent_sessions(status, None),
        channels: parse_channels(health),
        memory,
        security: decode_all(
            array_at(status, "/securityAudit/findings").iter().cloned(),
            "security finding",
        ),
        os: object_or_empty(status, "/os"),
        update: object_or_empty(status, "/update"),
        total_sessions: i64_at(status, "/agents/totalSessions"),
        health_ok: bool_at(health, "/ok"),
    }
}

/// Flatten `health.channels.<id>.accounts.<account>` into one row per account.
#[must_use]
pub fn parse_channels(health: &Value) -> Vec<ChannelHealth> {
    let Some(channels) = object_at(health, "/channels") else {
        return Vec::new();
    };
    let labels = object_at(health, "/channelLabels");

    let mut rows = Vec::new();
    for (channel_id, channel) in channels {
        let name = labels
            .and_then(|l| l.get(channel_id))
            .and_then(Value::as_str)
            .unwrap_or(channel_id)
            .to_string();

        let Some(accounts) = object_at(channel, "/accounts") else {
            continue;
        };
        for (account_id, account) in accounts {
            let text = |pointer: &str| {
                account.pointer(pointer).and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
            };
            rows.push(ChannelHealth {
                name: name.clone(),
                channel_id: channel_id.clone(),
                configured: account.get("configured").and_then(Value::as_bool).unwrap_or(false),
                running: account.get("running").and_then(Value::as_bool).unwrap_or(false),
                probe_ok: account.pointer("/probe/ok").and_then(Value::as_bool),
                probe_elapsed_ms: account.pointer("/probe/elapsedMs").and_then(Value::as_i64),
                bot_username: text("/probe/bot/username"),
                bot_id: text("/probe/bot/id"),
                last_error: text("/lastError"),
                account_id: account_id.clone(),
            });
        }
    }
    rows
}

/// Summary counters from `status` and `health`.
#[must_use]
pub fn metrics_summary(status: &Value, health: &Value) -> MetricsSummary {
    let channels = object_at(health, "/channels");
    let channels_healthy = channels.map_or(0, |c| {
        c.values()
            .filter(|ch| ch.pointer("/probe/ok").and_then(Value::as_bool) == Some(true))
            .count()
    });

    MetricsSummary {
        total_agents: array_at(status, "/agents/agents").len(),
        total_sessions: i64_at(status, "/agents/totalSessions"),
        total_channels: channels.map_or(0, Map::len),
        channels_healthy,
        gateway_reachable: status
            .pointer("/gateway/reachable")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        gateway_latency_ms: i64_at(status, "/gateway/connectLatencyMs"),
        security_critical: i64_at(status, "/securityAudit/summary/critical"),
        security_warnings: i64_at(status, "/securityAudit/summary/warn"),
        memory_chunks: i64_at(status, "/memory/chunks"),
        memory_files: i64_at(status, "/memory/files"),
    }
}

/// Parse newline-delimited JSON log text; unparsable lines become `{"raw": line}`.
#[must_use]
pub fn parse_log_lines(raw: &str) -> Vec<Value> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).unwrap_or_else(|_| serde_json::json!({ "raw": line }))
        })
        .collect()
}
