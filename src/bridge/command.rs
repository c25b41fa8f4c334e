//! Gateway CLI command construction.
//!
//! A [`LogicalCommand`] names a query independently of how it is executed.
//! [`CommandBuilder`] turns it into the concrete argv for the host platform,
//! always requesting JSON output and attaching the auth token when one is
//! configured.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Flag requesting machine-readable output.
pub const JSON_FLAG: &str = "--json";

/// Flag carrying the gateway auth token.
pub const TOKEN_FLAG: &str = "--token";

/// Default executable name of the gateway CLI.
pub const DEFAULT_CLI: &str = "openclaw";

/// Default wrapper used to reach the CLI from a Windows host.
pub const DEFAULT_WSL_WRAPPER: [&str; 4] = ["wsl", "--", "bash", "-lc"];

/// An ordered argument list identifying a gateway query.
///
/// Two commands are equal when their joined string forms are equal; that
/// string is also the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalCommand {
    args: Vec<String>,
}

impl LogicalCommand {
    /// Create a command from its arguments.
    #[must_use]
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The arguments, in order.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The space-joined form used as the cache key.
    #[must_use]
    pub fn key(&self) -> String {
        self.args.join(" ")
    }

    fn requests_json(&self) -> bool {
        self.args.iter().any(|arg| arg == JSON_FLAG)
    }
}

impl fmt::Display for LogicalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// How the CLI is reached from this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPlatform {
    /// The CLI runs on this OS; arguments are passed as discrete argv elements.
    Native,
    /// The CLI lives in another OS environment reached through a shell wrapper.
    ///
    /// The logical command becomes a single shell string appended to `wrapper`.
    Foreign { wrapper: Vec<String> },
}

impl HostPlatform {
    /// Foreign platform using the default `wsl -- bash -lc` wrapper.
    #[must_use]
    pub fn wsl() -> Self {
        Self::Foreign {
            wrapper: DEFAULT_WSL_WRAPPER.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Pick the platform for the current host: WSL on Windows, native elsewhere.
    #[must_use]
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::wsl()
        } else {
            Self::Native
        }
    }

    /// Resolve a configured platform selection.
    ///
    /// A non-empty `wrapper` replaces the default WSL prefix.
    #[must_use]
    pub fn from_selection(selection: PlatformSelection, wrapper: &[String]) -> Self {
        let platform = match selection {
            PlatformSelection::Auto => Self::detect(),
            PlatformSelection::Native => Self::Native,
            PlatformSelection::Wsl => Self::wsl(),
        };
        match platform {
            Self::Foreign { .. } if !wrapper.is_empty() => Self::Foreign {
                wrapper: wrapper.to_vec(),
            },
            other => other,
        }
    }
}

/// Platform choice as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformSelection {
    #[default]
    Auto,
    Native,
    Wsl,
}

/// Builds concrete invocations of the gateway CLI.
#[derive(Clone)]
pub struct CommandBuilder {
    cli: String,
    token: Option<String>,
    platform: HostPlatform,
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("cli", &self.cli)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("platform", &self.platform)
            .finish()
    }
}

impl CommandBuilder {
    /// Create a builder for the given CLI executable on the given platform.
    #[must_use]
    pub fn new(cli: impl Into<String>, platform: HostPlatform) -> Self {
        Self {
            cli: cli.into(),
            token: None,
            platform,
        }
    }

    /// Attach an auth token. Empty tokens are ignored.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    /// The platform strategy in use.
    #[must_use]
    pub fn platform(&self) -> &HostPlatform {
        &self.platform
    }

    /// The CLI executable name.
    #[must_use]
    pub fn cli(&self) -> &str {
        &self.cli
    }

    /// Build the concrete argv for a logical command.
    ///
    /// `--json` is appended unless the command already carries it, followed by
    /// `--token <token>` when configured.
    #[must_use]
    pub fn build(&self, command: &LogicalCommand) -> Vec<String> {
        let mut words = Vec::with_capacity(command.args().len() + 4);
        words.push(self.cli.clone());
        words.extend(command.args().iter().cloned());
        if !command.requests_json() {
            words.push(JSON_FLAG.to_string());
        }
        if let Some(token) = &self.token {
            words.push(TOKEN_FLAG.to_string());
            words.push(token.clone());
        }

        match &self.platform {
            HostPlatform::Native => words,
            HostPlatform::Foreign { wrapper } => {
                let mut argv = wrapper.clone();
                argv.push(shell_join(&words));
                argv
            }
        }
    }

    /// Build the follow-mode log tail command.
    #[must_use]
    pub fn build_follow_logs(&self) -> Vec<String> {
        self.build(&LogicalCommand::new(["logs", "--follow"]))
    }
}

fn shell_join(words: &[String]) -> String {
    words
        .iter()
        .map(|word| shell_escape::unix::escape(Cow::Borrowed(word.as_str())))
        .collect::<Vec<_>>()
        .join(" ")
}
