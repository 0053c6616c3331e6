// src/exec/command_manager.rs

//! Job manager for a named group of command jobs.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::engine::{JobCompletion, JobOutcome};
use crate::errors::{JobRunnerError, Result};
use crate::job::{JobManager, RunnableJob};

use super::{CommandJob, ProgressPattern};

/// Per-group tally of finished jobs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GroupSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl GroupSummary {
    pub fn finished(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

/// Owns the command jobs of one config group and tallies their outcomes.
#[derive(Debug)]
pub struct CommandJobManager {
    name: String,
    jobs: Vec<Arc<CommandJob>>,
    summary: Mutex<GroupSummary>,
}

impl CommandJobManager {
    pub fn new(name: impl Into<String>, jobs: Vec<CommandJob>) -> Self {
        Self {
            name: name.into(),
            jobs: jobs.into_iter().map(Arc::new).collect(),
            summary: Mutex::new(GroupSummary::default()),
        }
    }

    pub fn command_jobs(&self) -> &[Arc<CommandJob>] {
        &self.jobs
    }

    pub fn summary(&self) -> GroupSummary {
        *self.summary.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobManager for CommandJobManager {
    fn name(&self) -> &str {
        &self.name
    }

    fn jobs(&self) -> anyhow::Result<Vec<Arc<dyn RunnableJob>>> {
        Ok(self
            .jobs
            .iter()
            .map(|job| Arc::clone(job) as Arc<dyn RunnableJob>)
            .collect())
    }

    fn job_completed(&self, completion: &JobCompletion) {
        let outcome = completion.outcome();
        let summary = {
            let mut summary = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
            match outcome {
                JobOutcome::Succeeded => summary.succeeded += 1,
                JobOutcome::Failed => summary.failed += 1,
                JobOutcome::Cancelled => summary.cancelled += 1,
            }
            *summary
        };

        match completion.error() {
            None => info!(
                group = %self.name,
                job = %completion.job().name(),
                finished = summary.finished(),
                total = self.jobs.len(),
                "job finished"
            ),
            Some(err) => warn!(
                group = %self.name,
                job = %completion.job().name(),
                ?outcome,
                error = %err,
                finished = summary.finished(),
                total = self.jobs.len(),
                "job did not succeed"
            ),
        }
    }
}

/// One manager per config group, in [`ConfigFile::groups`] order.
pub fn managers_from_config(cfg: &ConfigFile) -> Result<Vec<Arc<CommandJobManager>>> {
    let mut managers = Vec::new();

    for (group, jobs) in cfg.groups() {
        let mut command_jobs = Vec::with_capacity(jobs.len());

        for (name, job_cfg) in jobs {
            let mut job = CommandJob::new(name, job_cfg.cmd.clone());

            if let Some(pattern) = job_cfg.effective_progress_pattern(&cfg.default) {
                let percent = job_cfg.effective_progress_is_percent(&cfg.default);
                let pattern = ProgressPattern::new(pattern, percent).map_err(|source| {
                    JobRunnerError::PatternError {
                        job: name.to_string(),
                        source,
                    }
                })?;
                job = job.with_progress_pattern(pattern);
            }

            command_jobs.push(job);
        }

        managers.push(Arc::new(CommandJobManager::new(group, command_jobs)));
    }

    Ok(managers)
}
