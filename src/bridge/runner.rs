//! Gateway CLI process execution.
//!
//! Every spawned child is owned by a [`ChildGuard`]. Dropping the guard kills
//! the child and hands the reap to the runtime; [`ChildGuard::shutdown`] kills
//! and reaps inline. Either way no child outlives its owner.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;

use super::error::{snippet, BridgeError};

/// Timeout for one-shot CLI queries.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(20);

/// Timeout for one-shot log reads.
pub const DEFAULT_LOGS_TIMEOUT: Duration = Duration::from_secs(15);

/// Executes a concrete argv and returns its trimmed stdout.
///
/// `label` names the command in logs and errors. It is the logical command,
/// so credentials in `argv` never leave the runner.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `argv` to completion within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError` if the process cannot start, exceeds `timeout`,
    /// or writes nothing to stdout.
    async fn run(
        &self,
        label: &str,
        argv: &[String],
        timeout: Duration,
    ) -> Result<String, BridgeError>;
}

/// [`CommandRunner`] backed by real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        label: &str,
        argv: &[String],
        timeout: Duration,
    ) -> Result<String, BridgeError> {
        let command = label.to_string();
        let mut guard = ChildGuard::spawn(argv)?;
        let stdout = guard.take_stdout();
        let stderr = guard.take_stderr();

        let collected = tokio::time::timeout(timeout, collect(&mut guard, stdout, stderr)).await;

        let (stdout, stderr, status) = match collected {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                guard.shutdown().await;
                return Err(BridgeError::Io { command, source });
            }
            Err(_) => {
                tracing::warn!(command = %command, ?timeout, "Gateway CLI timed out, killing");
                guard.shutdown().await;
                return Err(BridgeError::Timeout { command, timeout });
            }
        };
        guard.release();

        if !status.success() {
            tracing::debug!(command = %command, %status, "Gateway CLI exited unsuccessfully");
        }

        let raw = String::from_utf8_lossy(&stdout).trim().to_string();
        if raw.is_empty() {
            let stderr = String::from_utf8_lossy(&stderr);
            let stderr = stderr.trim();
            let detail = if stderr.is_empty() {
                "empty output".to_string()
            } else {
                snippet(stderr)
            };
            return Err(BridgeError::EmptyOutput { command, detail });
        }

        Ok(raw)
    }
}

async fn collect(
    guard: &mut ChildGuard,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
) -> std::io::Result<(Vec<u8>, Vec<u8>, ExitStatus)> {
    let read_stdout = async {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stdout {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<_, std::io::Error>(buf)
    };
    let read_stderr = async {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stderr {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<_, std::io::Error>(buf)
    };

    tokio::try_join!(read_stdout, read_stderr, guard.wait())
}

/// Owns a spawned child process and guarantees it is killed and reaped.
#[derive(Debug)]
pub struct ChildGuard {
    child: Option<Child>,
    stderr_task: Option<JoinHandle<()>>,
}

impl ChildGuard {
    /// Spawn `argv` with piped stdout/stderr and a null stdin.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Spawn` if `argv` is empty or the process fails
    /// to start.
    pub fn spawn(argv: &[String]) -> Result<Self, BridgeError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(BridgeError::Spawn {
                program: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
            });
        };

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                program: program.clone(),
                source,
            })?;

        tracing::debug!(program = %program, pid = ?child.id(), "Spawned gateway CLI");
        Ok(Self {
            child: Some(child),
            stderr_task: None,
        })
    }

    /// OS process id, if the child has not been reaped yet.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Take ownership of the stdout handle.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.as_mut().and_then(|c| c.stdout.take())
    }

    /// Take ownership of the stderr handle.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.as_mut().and_then(|c| c.stderr.take())
    }

    /// Drain stderr into the debug log for as long as the child holds it open.
    ///
    /// Must be called from within a tokio runtime. The draining task is
    /// aborted together with the child.
    pub fn forward_stderr(&mut self) {
        let Some(stderr) = self.take_stderr() else {
            return;
        };
        let pid = self.id();
        self.stderr_task = Some(tokio::spawn(async move {
            let mut segments = BufReader::new(stderr).split(b'\n');
            while let Ok(Some(segment)) = segments.next_segment().await {
                let line = String::from_utf8_lossy(&segment);
                tracing::debug!(?pid, line = %line.trim_end(), "Gateway CLI stderr");
            }
        }));
    }

    /// Wait for the child to exit on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails or the child was already released.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        match self.child.as_mut() {
            Some(child) => child.wait().await,
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "child already released",
            )),
        }
    }

    /// Force kill the child and wait for it to be reaped.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        if let Some(mut child) = self.child.take() {
            // kill() sends SIGKILL and then waits, so the child is reaped here.
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "Gateway CLI already gone");
            }
        }
    }

    /// Forget a child that has already been waited on.
    fn release(mut self) {
        self.child.take();
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        let Some(mut child) = self.child.take() else {
            return;
        };
        let _ = child.start_kill();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(_) => {
                let _ = child.try_wait();
            }
        }
    }
}
