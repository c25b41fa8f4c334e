//! Configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bridge::{
    BridgeSettings, CommandBuilder, HostPlatform, PlatformSelection, DEFAULT_CLI,
    DEFAULT_IDLE_TIMEOUT,
};

/// Default dashboard origin allowed through CORS.
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Default port for the bridge HTTP server.
pub const DEFAULT_PORT: u16 = 8000;

/// How to reach the gateway CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// CLI executable name or path.
    pub command: String,
    /// Auth token passed as `--token`; empty means none.
    pub token: String,
    /// Platform strategy (`auto`, `native`, `wsl`).
    pub platform: PlatformSelection,
    /// Custom wrapper prefix for the foreign platform.
    pub wrapper: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_CLI.to_string(),
            token: String::new(),
            platform: PlatformSelection::Auto,
            wrapper: Vec::new(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to make credentialed cross-origin requests.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            cors_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
        }
    }
}

/// Result cache TTLs, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub default_ttl_secs: f64,
    pub gateway_health_ttl_secs: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3.0,
            gateway_health_ttl_secs: 5.0,
        }
    }
}

/// Process timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub command_secs: f64,
    pub logs_secs: f64,
    pub stream_idle_secs: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_secs: 20.0,
            logs_secs: 15.0,
            stream_idle_secs: DEFAULT_IDLE_TIMEOUT.as_secs_f64(),
        }
    }
}

/// Full bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    pub gateway: GatewayConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub timeouts: TimeoutConfig,
}

impl BridgeConfig {
    /// Command builder for the configured CLI, token, and platform.
    #[must_use]
    pub fn command_builder(&self) -> CommandBuilder {
        let platform = HostPlatform::from_selection(self.gateway.platform, &self.gateway.wrapper);
        CommandBuilder::new(self.gateway.command.clone(), platform).token(self.gateway.token.clone())
    }

    /// Cache and timeout settings for the facade.
    #[must_use]
    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            default_ttl: secs(self.cache.default_ttl_secs),
            gateway_health_ttl: secs(self.cache.gateway_health_ttl_secs),
            command_timeout: secs(self.timeouts.command_secs),
            logs_timeout: secs(self.timeouts.logs_secs),
        }
    }

    /// Idle window for the log relay.
    #[must_use]
    pub fn stream_idle_timeout(&self) -> Duration {
        secs(self.timeouts.stream_idle_secs)
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Apply `OPENCLAW_CMD`, `OPENCLAW_TOKEN`, and `CORS_ORIGINS` overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(command) = lookup("OPENCLAW_CMD").filter(|v| !v.trim().is_empty()) {
            self.gateway.command = command.trim().to_string();
        }
        if let Some(token) = lookup("OPENCLAW_TOKEN") {
            self.gateway.token = token.trim().to_string();
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
    }
}

/// Negative or non-finite values clamp to zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
