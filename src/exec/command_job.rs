// src/exec/command_job.rs

//! A [`RunnableJob`] that runs one shell command.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStdout, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{CommandFailed, JobCancelled};
use crate::job::{JobFuture, JobProgress, RunnableJob};

use super::ProgressPattern;

/// Shell command executed as a job.
///
/// - stdout lines matching the progress pattern advance the job's progress;
///   other lines are logged at debug.
/// - stderr is always drained and logged at debug.
/// - Exit status 0 is success and sets progress to 1. Any other status fails
///   the job with [`CommandFailed`].
/// - When the cancellation token fires, the child is killed and the job
///   fails with [`JobCancelled`].
#[derive(Debug)]
pub struct CommandJob {
    name: String,
    cmd: String,
    progress_pattern: Option<ProgressPattern>,
    progress: Arc<JobProgress>,
}

impl CommandJob {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            progress_pattern: None,
            progress: Arc::new(JobProgress::new()),
        }
    }

    pub fn with_progress_pattern(mut self, pattern: ProgressPattern) -> Self {
        self.progress_pattern = Some(pattern);
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    pub fn progress_pattern(&self) -> Option<&ProgressPattern> {
        self.progress_pattern.as_ref()
    }

    async fn execute(&self, cancel: CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            debug!(job = %self.name, "cancelled before start; not spawning process");
            return Err(JobCancelled.into());
        }

        info!(job = %self.name, cmd = %self.cmd, "starting job process");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for job '{}'", self.name))?;

        if let Some(stdout) = child.stdout.take() {
            self.spawn_stdout_monitor(stdout);
        }

        if let Some(stderr) = child.stderr.take() {
            let job_name = self.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(job = %job_name, "stderr: {}", line);
                }
            });
        }

        tokio::select! {
            status_res = child.wait() => {
                let status = status_res
                    .with_context(|| format!("waiting for process of job '{}'", self.name))?;
                let code = status.code().unwrap_or(-1);

                info!(
                    job = %self.name,
                    exit_code = code,
                    success = status.success(),
                    "job process exited"
                );

                if status.success() {
                    self.progress.finish();
                    Ok(())
                } else {
                    Err(CommandFailed { code }.into())
                }
            }

            _ = cancel.cancelled() => {
                info!(job = %self.name, "cancellation requested; killing job process");
                if let Err(e) = child.kill().await {
                    warn!(job = %self.name, error = %e, "failed to kill job process");
                }
                Err(JobCancelled.into())
            }
        }
    }

    fn spawn_stdout_monitor(&self, stdout: ChildStdout) {
        let job_name = self.name.clone();
        let pattern = self.progress_pattern.clone();
        let progress = Arc::clone(&self.progress);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match pattern.as_ref().and_then(|p| p.parse_line(&line)) {
                    Some(value) => {
                        progress.set(value);
                        debug!(job = %job_name, progress = progress.get(), "progress update");
                    }
                    None => debug!(job = %job_name, "stdout: {}", line),
                }
            }
        });
    }
}

impl RunnableJob for CommandJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn progress(&self) -> f64 {
        self.progress.get()
    }

    fn run(&self, cancel: CancellationToken) -> JobFuture<'_> {
        Box::pin(self.execute(cancel))
    }
}
