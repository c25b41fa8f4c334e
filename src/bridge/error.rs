//! Bridge error types.

use std::time::Duration;

/// Maximum number of characters of raw output or stderr kept in an error.
pub const SNIPPET_MAX_CHARS: usize = 200;

/// Errors raised while invoking the gateway CLI.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// The process could not be started.
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exceeded its wall-clock budget and was killed.
    #[error("openclaw {command}: timed out after {}s", .timeout.as_secs_f64())]
    Timeout { command: String, timeout: Duration },

    /// The process produced nothing on stdout.
    #[error("openclaw {command}: {detail}")]
    EmptyOutput { command: String, detail: String },

    /// Stdout was not a valid JSON document.
    #[error("openclaw {command}: invalid JSON ({source}): {snippet}")]
    Decode {
        command: String,
        snippet: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reading the pipes or waiting on the child failed after spawn.
    #[error("openclaw {command}: I/O error: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl BridgeError {
    /// Build a decode error, keeping a bounded snippet of the raw output.
    #[must_use]
    pub fn decode(command: impl Into<String>, raw: &str, source: serde_json::Error) -> Self {
        Self::Decode {
            command: command.into(),
            snippet: snippet(raw),
            source,
        }
    }

    /// Whether this error came from the wall-clock timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// The gateway could not answer a required query.
///
/// Every [`BridgeError`] collapses into this at the facade boundary; the
/// original diagnostic stays reachable through `source`.
#[derive(thiserror::Error, Debug)]
#[error("OpenClaw unreachable: {source}")]
pub struct BridgeUnavailable {
    #[from]
    source: BridgeError,
}

impl BridgeUnavailable {
    /// The underlying failure.
    #[must_use]
    pub fn cause(&self) -> &BridgeError {
        &self.source
    }
}

pub(crate) fn snippet(raw: &str) -> String {
    if raw.chars().count() <= SNIPPET_MAX_CHARS {
        return raw.to_string();
    }
    let mut cut: String = raw.chars().take(SNIPPET_MAX_CHARS).collect();
    cut.push_str("...");
    cut
}
