//! Execution of a single pipeline stage.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::stage::Stage;
use crate::tools::Toolchain;
use crate::{Error, Result};

/// How long to keep reading stderr after killing a stage.
const STDERR_GRACE: Duration = Duration::from_millis(500);

/// Classified result of running one stage.
#[derive(Debug)]
pub enum StageOutcome {
    /// The tool exited zero and wrote a non-empty artifact.
    Success(PathBuf),
    /// The tool exited non-zero, timed out, or left no usable artifact.
    ToolFailure {
        exit_code: Option<i32>,
        diagnostics: String,
    },
    /// The executable could not be located or launched.
    ToolNotFound,
    /// The cancellation token fired while the tool was running.
    Cancelled,
}

impl StageOutcome {
    /// Convert into the crate error taxonomy, keeping the artifact on success.
    pub fn into_result(self, stage: &Stage) -> Result<PathBuf> {
        let tool = stage.tool().executable();
        match self {
            StageOutcome::Success(path) => Ok(path),
            StageOutcome::ToolFailure {
                exit_code,
                diagnostics,
            } => Err(Error::tool_failure(tool, exit_code, diagnostics)),
            StageOutcome::ToolNotFound => Err(Error::tool_not_found(tool)),
            StageOutcome::Cancelled => Err(Error::Cancelled),
        }
    }
}

/// Runs stages as child processes, one at a time.
#[derive(Debug, Clone)]
pub struct StageRunner {
    tools: Toolchain,
    timeout: Option<Duration>,
    cancellation: CancellationToken,
}

impl StageRunner {
    pub fn new(tools: Toolchain) -> Self {
        Self {
            tools,
            timeout: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Kill any stage that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Abort the running stage when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Run `stage` to completion inside `working_dir`.
    ///
    /// Blocks the calling task until the child exits. Only an exit status of
    /// zero *and* a non-empty declared output count as success.
    pub async fn run(&self, stage: &Stage, working_dir: &Path) -> StageOutcome {
        if self.cancellation.is_cancelled() {
            return StageOutcome::Cancelled;
        }

        let program = match self.tools.resolve(stage.tool()) {
            Ok(path) => path,
            Err(_) => return StageOutcome::ToolNotFound,
        };

        tracing::debug!("{}: {} {:?}", stage.name(), program.display(), stage.args());

        let mut cmd = Command::new(&program);
        cmd.args(stage.args())
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StageOutcome::ToolNotFound,
            Err(e) => {
                return StageOutcome::ToolFailure {
                    exit_code: None,
                    diagnostics: format!("failed to spawn {}: {e}", program.display()),
                }
            }
        };

        // Drain stderr concurrently so a chatty tool cannot fill the pipe
        // and stall.
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let deadline = async {
            match self.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        enum Waited {
            Exited(std::io::Result<ExitStatus>),
            Cancelled,
            TimedOut,
        }

        let waited = tokio::select! {
            status = child.wait() => Waited::Exited(status),
            _ = self.cancellation.cancelled() => Waited::Cancelled,
            _ = deadline => Waited::TimedOut,
        };

        let killed = !matches!(waited, Waited::Exited(_));
        if killed {
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to terminate {}: {}", stage.tool(), e);
            }
        }

        // A killed tool may leave grandchildren holding stderr open.
        let diagnostics = match stderr_task {
            Some(task) if killed => tokio::time::timeout(STDERR_GRACE, task)
                .await
                .ok()
                .and_then(|joined| joined.ok())
                .unwrap_or_default(),
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        match waited {
            Waited::Cancelled => {
                tracing::info!("Cancelled: {}", stage.name());
                StageOutcome::Cancelled
            }
            Waited::TimedOut => StageOutcome::ToolFailure {
                exit_code: None,
                diagnostics: with_diagnostics(
                    format!("timed out after {:?}", self.timeout.unwrap_or_default()),
                    &diagnostics,
                ),
            },
            Waited::Exited(Err(e)) => StageOutcome::ToolFailure {
                exit_code: None,
                diagnostics: with_diagnostics(format!("I/O error waiting for process: {e}"), &diagnostics),
            },
            Waited::Exited(Ok(status)) if !status.success() => StageOutcome::ToolFailure {
                exit_code: status.code(),
                diagnostics,
            },
            Waited::Exited(Ok(_)) => check_artifact(stage.output(), diagnostics),
        }
    }
}

/// `summary` followed by whatever the tool wrote to stderr.
fn with_diagnostics(summary: String, diagnostics: &str) -> String {
    if diagnostics.trim().is_empty() {
        summary
    } else {
        format!("{summary}\n{diagnostics}")
    }
}

fn check_artifact(output: &Path, diagnostics: String) -> StageOutcome {
    match std::fs::metadata(output) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => StageOutcome::Success(output.to_path_buf()),
        Ok(_) => StageOutcome::ToolFailure {
            exit_code: Some(0),
            diagnostics: format!(
                "reported success but {} is empty\n{}",
                output.display(),
                diagnostics
            ),
        },
        Err(_) => StageOutcome::ToolFailure {
            exit_code: Some(0),
            diagnostics: format!(
                "reported success but did not write {}\n{}",
                output.display(),
                diagnostics
            ),
        },
    }
}
