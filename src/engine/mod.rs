// src/engine/mod.rs

//! The job-running engine.
//!
//! This module ties together:
//! - the completion records handed to observers ([`JobCompletion`],
//!   [`BatchCompletion`]) and the event type that carries them
//! - the locked bookkeeping for one runner ([`state`])
//! - the async shell that drains managers, spawns jobs and delivers
//!   notifications ([`runner`])

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::JobCancelled;
use crate::job::RunnableJob;

pub mod runner;
pub mod state;

pub use runner::JobRunner;
pub use state::RunnerState;

/// Identifier assigned by the runner to each launched job.
pub type JobId = u64;

/// Terminal state of one job, as seen by hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

/// Outcome record for one finished job. Immutable once built.
#[derive(Clone)]
pub struct JobCompletion {
    id: JobId,
    job: Arc<dyn RunnableJob>,
    manager: String,
    elapsed: Duration,
    error: Option<Arc<anyhow::Error>>,
}

impl JobCompletion {
    pub(crate) fn new(
        id: JobId,
        job: Arc<dyn RunnableJob>,
        manager: String,
        elapsed: Duration,
        error: Option<Arc<anyhow::Error>>,
    ) -> Self {
        Self {
            id,
            job,
            manager,
            elapsed,
            error,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn job(&self) -> &Arc<dyn RunnableJob> {
        &self.job
    }

    /// Name of the manager that produced the job.
    pub fn manager(&self) -> &str {
        &self.manager
    }

    /// Time from the start of the run that launched this job until it finished.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Error the job finished with; `None` means success.
    pub fn error(&self) -> Option<&Arc<anyhow::Error>> {
        self.error.as_ref()
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn outcome(&self) -> JobOutcome {
        match &self.error {
            None => JobOutcome::Succeeded,
            Some(err) if err.downcast_ref::<JobCancelled>().is_some() => JobOutcome::Cancelled,
            Some(_) => JobOutcome::Failed,
        }
    }
}

impl fmt::Debug for JobCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobCompletion")
            .field("id", &self.id)
            .field("job", &self.job.name())
            .field("manager", &self.manager)
            .field("elapsed", &self.elapsed)
            .field("error", &self.error)
            .finish()
    }
}

/// Outcome record for a whole batch, built when its last job finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCompletion {
    /// Wall-clock time from the start of the run to the last completion.
    pub elapsed: Duration,
    /// Jobs launched in this batch.
    pub total_jobs: usize,
    /// Jobs in this batch that finished with an error.
    pub failed_jobs: usize,
}

/// Notifications raised by the runner.
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    /// One job finished (successfully or not).
    JobCompleted(JobCompletion),
    /// Every job launched for the batch has finished.
    AllCompleted(BatchCompletion),
}

/// Observer callback, invoked synchronously on the task that raised the event.
pub type EventHandler = Arc<dyn Fn(&RunnerEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobFuture, JobProgress};
    use tokio_util::sync::CancellationToken;

    struct Noop(JobProgress);

    impl RunnableJob for Noop {
        fn progress(&self) -> f64 {
            self.0.get()
        }

        fn run(&self, _cancel: CancellationToken) -> JobFuture<'_> {
            Box::pin(async { Ok(()) })
        }
    }

    fn completion(error: Option<anyhow::Error>) -> JobCompletion {
        JobCompletion::new(
            7,
            Arc::new(Noop(JobProgress::new())),
            "m".to_string(),
            Duration::from_millis(5),
            error.map(Arc::new),
        )
    }

    #[test]
    fn outcome_is_derived_from_error() {
        assert_eq!(completion(None).outcome(), JobOutcome::Succeeded);
        assert_eq!(
            completion(Some(anyhow::anyhow!("nope"))).outcome(),
            JobOutcome::Failed
        );
        assert_eq!(
            completion(Some(JobCancelled.into())).outcome(),
            JobOutcome::Cancelled
        );
    }

    #[test]
    fn debug_shows_job_name() {
        let text = format!("{:?}", completion(None));
        assert!(text.contains("job: \"job\""));
        assert!(text.contains("id: 7"));
    }
}
