//! Follow-mode log relay.
//!
//! Keeps a `logs --follow` child alive and turns its stdout into a stream of
//! [`RelayEvent`]s, with a keepalive whenever the child stays quiet for the
//! idle window. The child is killed and reaped when the stream ends and when
//! the consumer drops it.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Split};
use tokio::process::ChildStdout;

use super::error::BridgeError;
use super::runner::ChildGuard;

/// Idle window after which a keepalive is emitted.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Lifecycle of a relay connection.
///
/// `Starting -> Streaming -> Closing -> Closed`, or `Starting -> Closed` when
/// the child cannot be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Starting,
    Streaming,
    Closing,
    Closed,
}

/// One item delivered to the relay consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A trimmed, non-empty line of child output. Never contains `\r` or `\n`.
    Line(String),
    /// No output arrived within the idle window.
    Keepalive,
    /// The child could not be started.
    Error(String),
}

impl RelayEvent {
    /// Payload for the wire: the line itself, or a small JSON object.
    #[must_use]
    pub fn payload(&self) -> String {
        match self {
            Self::Line(line) => line.clone(),
            Self::Keepalive => r#"{"keepalive": true}"#.to_string(),
            Self::Error(message) => serde_json::json!({ "error": message }).to_string(),
        }
    }
}

/// Spawns and drives a follow-mode child process.
#[derive(Debug, Clone)]
pub struct LogRelay {
    argv: Vec<String>,
    idle_timeout: Duration,
}

impl LogRelay {
    #[must_use]
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Set the idle window (builder pattern).
    #[must_use]
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Return the event stream. The child is spawned on first poll.
    ///
    /// A spawn failure produces a stream holding a single
    /// [`RelayEvent::Error`].
    #[must_use]
    pub fn start(self) -> BoxStream<'static, RelayEvent> {
        let argv = self.argv;
        RelayDriver::with_launch(Box::new(move || spawn_follow(&argv)), self.idle_timeout)
            .into_stream()
    }
}

fn spawn_follow(argv: &[String]) -> Result<(ChildStdout, Option<ChildGuard>), BridgeError> {
    let mut child = ChildGuard::spawn(argv)?;
    child.forward_stderr();
    let stdout = child.take_stdout().ok_or_else(|| BridgeError::Io {
        command: "logs --follow".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout unavailable"),
    })?;
    tracing::info!(pid = ?child.id(), "Log relay streaming");
    Ok((stdout, Some(child)))
}

type Launch<R> = Box<dyn FnOnce() -> Result<(R, Option<ChildGuard>), BridgeError> + Send>;

/// Reads lines from a reader under an idle timeout.
///
/// The reader (and optional child) are produced by a launch step run on the
/// first call to [`RelayDriver::next_event`]. When a child is present it is
/// shut down on end-of-stream, and killed on drop.
pub struct RelayDriver<R> {
    state: RelayState,
    launch: Option<Launch<R>>,
    segments: Option<Split<BufReader<R>>>,
    pending: VecDeque<String>,
    child: Option<ChildGuard>,
    idle_timeout: Duration,
}

impl<R> RelayDriver<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Relay an already-open reader.
    #[must_use]
    pub fn new(reader: R, child: Option<ChildGuard>, idle_timeout: Duration) -> Self {
        Self::with_launch(
            Box::new(move || Ok::<_, BridgeError>((reader, child))),
            idle_timeout,
        )
    }

    fn with_launch(launch: Launch<R>, idle_timeout: Duration) -> Self {
        Self {
            state: RelayState::Starting,
            launch: Some(launch),
            segments: None,
            pending: VecDeque::new(),
            child: None,
            idle_timeout,
        }
    }

    #[must_use]
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Advance to the next event, or `None` once the relay is closed.
    pub async fn next_event(&mut self) -> Option<RelayEvent> {
        loop {
            match self.state {
                RelayState::Starting => match self.launch.take().map(|launch| launch()) {
                    Some(Ok((reader, child))) => {
                        self.segments = Some(BufReader::new(reader).split(b'\n'));
                        self.child = child;
                        self.state = RelayState::Streaming;
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Failed to start log relay");
                        self.state = RelayState::Closed;
                        return Some(RelayEvent::Error(e.to_string()));
                    }
                    None => self.state = RelayState::Closed,
                },
                RelayState::Streaming => {
                    if let Some(line) = self.pending.pop_front() {
                        return Some(RelayEvent::Line(line));
                    }
                    let Some(segments) = self.segments.as_mut() else {
                        self.state = RelayState::Closing;
                        continue;
                    };
                    let read = tokio::time::timeout(self.idle_timeout, segments.next_segment()).await;
                    match read {
                        Err(_) => {
                            tracing::trace!("Log relay idle, sending keepalive");
                            return Some(RelayEvent::Keepalive);
                        }
                        Ok(Ok(Some(segment))) => self.push_lines(&segment),
                        Ok(Ok(None)) => {
                            tracing::debug!("Log relay child closed its output");
                            self.state = RelayState::Closing;
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(error = %e, "Log relay read failed");
                            self.state = RelayState::Closing;
                        }
                    }
                }
                RelayState::Closing => {
                    if let Some(child) = self.child.take() {
                        child.shutdown().await;
                    }
                    self.segments = None;
                    self.state = RelayState::Closed;
                }
                RelayState::Closed => return None,
            }
        }
    }

    /// Queue the non-blank pieces of one output line. A carriage return
    /// (progress output) starts a new piece.
    fn push_lines(&mut self, segment: &[u8]) {
        let text = String::from_utf8_lossy(segment);
        self.pending.extend(
            text.split('\r')
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .map(str::to_string),
        );
    }

    /// Turn the driver into a stream; dropping the stream drops the child guard.
    #[must_use]
    pub fn into_stream(self) -> BoxStream<'static, RelayEvent> {
        stream::unfold(self, |mut driver| async move {
            driver.next_event().await.map(|event| (event, driver))
        })
        .boxed()
    }
}
