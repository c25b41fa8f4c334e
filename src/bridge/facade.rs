//! Gateway queries: build, cache, run, decode.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::cache::{ResultCache, DEFAULT_TTL, GATEWAY_HEALTH_TTL};
use super::command::{CommandBuilder, LogicalCommand};
use super::error::{BridgeError, BridgeUnavailable};
use super::runner::{CommandRunner, ProcessRunner, DEFAULT_COMMAND_TIMEOUT, DEFAULT_LOGS_TIMEOUT};

/// Timing knobs for [`GatewayBridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSettings {
    /// TTL for most queries.
    pub default_ttl: Duration,
    /// TTL for `gateway health`.
    pub gateway_health_ttl: Duration,
    /// Timeout for cached JSON queries.
    pub command_timeout: Duration,
    /// Timeout for one-shot log reads.
    pub logs_timeout: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            gateway_health_ttl: GATEWAY_HEALTH_TTL,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            logs_timeout: DEFAULT_LOGS_TIMEOUT,
        }
    }
}

/// Public surface over the gateway CLI.
///
/// Each query is answered from the shared [`ResultCache`] when fresh, and by
/// at most one CLI invocation otherwise. Nothing is retried.
#[derive(Clone)]
pub struct GatewayBridge {
    builder: CommandBuilder,
    runner: Arc<dyn CommandRunner>,
    cache: Arc<ResultCache>,
    settings: BridgeSettings,
}

impl std::fmt::Debug for GatewayBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayBridge")
            .field("builder", &self.builder)
            .field("cache_entries", &self.cache.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl GatewayBridge {
    /// Create a bridge running real processes with default settings.
    #[must_use]
    pub fn new(builder: CommandBuilder, cache: Arc<ResultCache>) -> Self {
        Self::with_runner(builder, Arc::new(ProcessRunner), cache)
    }

    /// Create a bridge with a custom runner.
    #[must_use]
    pub fn with_runner(
        builder: CommandBuilder,
        runner: Arc<dyn CommandRunner>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            builder,
            runner,
            cache,
            settings: BridgeSettings::default(),
        }
    }

    /// Replace the timing settings (builder pattern).
    #[must_use]
    pub fn with_settings(mut self, settings: BridgeSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    #[must_use]
    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    /// Run a logical query through the cache with the given TTL.
    ///
    /// # Errors
    ///
    /// Returns `BridgeUnavailable` if the CLI fails, times out, or prints
    /// something that is not a JSON document.
    pub async fn query(
        &self,
        command: &LogicalCommand,
        ttl: Duration,
    ) -> Result<Value, BridgeUnavailable> {
        let key = command.key();
        if let Some(value) = self.cache.get(&key, ttl) {
            tracing::trace!(command = %key, "Cache hit");
            return Ok(value);
        }

        let argv = self.builder.build(command);
        tracing::debug!(command = %key, "Cache miss, invoking gateway CLI");
        let raw = self
            .runner
            .run(&key, &argv, self.settings.command_timeout)
            .await?;
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| BridgeError::decode(key.clone(), &raw, e))?;

        self.cache.put(key, value.clone());
        Ok(value)
    }

    async fn required(&self, args: &[&str]) -> Result<Value, BridgeUnavailable> {
        self.query(&LogicalCommand::new(args.iter().copied()), self.settings.default_ttl)
            .await
    }

    async fn best_effort(&self, args: &[&str]) -> Value {
        match self.required(args).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(command = %args.join(" "), error = %e, "Optional gateway query failed");
                Value::Array(Vec::new())
            }
        }
    }

    /// `openclaw status`.
    ///
    /// # Errors
    ///
    /// Returns `BridgeUnavailable` if the gateway cannot be queried.
    pub async fn status(&self) -> Result<Value, BridgeUnavailable> {
        self.required(&["status"]).await
    }

    /// `openclaw health`.
    ///
    /// # Errors
    ///
    /// Returns `BridgeUnavailable` if the gateway cannot be queried.
    pub async fn health(&self) -> Result<Value, BridgeUnavailable> {
        self.required(&["health"]).await
    }

    /// `openclaw agents list`.
    ///
    /// # Errors
    ///
    /// Returns `BridgeUnavailable` if the gateway cannot be queried.
    pub async fn agents(&self) -> Result<Value, BridgeUnavailable> {
        self.required(&["agents", "list"]).await
    }

    /// `openclaw sessions`.
    ///
    /// # Errors
    ///
    /// Returns `BridgeUnavailable` if the gateway cannot be queried.
    pub async fn sessions(&self) -> Result<Value, BridgeUnavailable> {
        self.required(&["sessions"]).await
    }

    /// `openclaw models list`.
    ///
    /// # Errors
    ///
    /// Returns `BridgeUnavailable` if the gateway cannot be queried.
    pub async fn models_list(&self) -> Result<Value, BridgeUnavailable> {
        self.required(&["models", "list"]).await
    }

    /// `openclaw models status`.
    ///
    /// # Errors
    ///
    /// Returns `BridgeUnavailable` if the gateway cannot be queried.
    pub async fn models_status(&self) -> Result<Value, BridgeUnavailable> {
        self.required(&["models", "status"]).await
    }

    /// `openclaw skills list`, or an empty array if it fails.
    pub async fn skills(&self) -> Value {
        self.best_effort(&["skills", "list"]).await
    }

    /// `openclaw channels list`, or an empty array if it fails.
    pub async fn channels(&self) -> Value {
        self.best_effort(&["channels", "list"]).await
    }

    /// `openclaw gateway health`, cached for the longer gateway TTL.
    ///
    /// # Errors
    ///
    /// Returns `BridgeUnavailable` if the gateway cannot be queried.
    pub async fn gateway_health(&self) -> Result<Value, BridgeUnavailable> {
        self.query(
            &LogicalCommand::new(["gateway", "health"]),
            self.settings.gateway_health_ttl,
        )
        .await
    }

    /// Recent log lines as raw newline-delimited JSON text. Not cached.
    ///
    /// A CLI that prints nothing yields an empty string.
    ///
    /// # Errors
    ///
    /// Returns `BridgeUnavailable` if the CLI cannot be started or times out.
    pub async fn recent_logs(&self, limit: u32) -> Result<String, BridgeUnavailable> {
        let limit = limit.to_string();
        let command = LogicalCommand::new(["logs", "--limit", limit.as_str()]);
        let argv = self.builder.build(&command);
        match self
            .runner
            .run(&command.key(), &argv, self.settings.logs_timeout)
            .await
        {
            Ok(raw) => Ok(raw),
            Err(BridgeError::EmptyOutput { .. }) => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Concrete argv for tailing logs in follow mode.
    #[must_use]
    pub fn log_stream_command(&self) -> Vec<String> {
        self.builder.build_follow_logs()
    }

    /// Drop all cached results.
    pub fn clear_cache(&self) {
        tracing::info!(entries = self.cache.len(), "Clearing gateway result cache");
        self.cache.clear();
    }
}
