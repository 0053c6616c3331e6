// src/job/manager.rs

use std::sync::Arc;

use crate::engine::JobCompletion;

use super::RunnableJob;

/// Producer of jobs and receiver of their completions.
///
/// The runner calls [`jobs`](JobManager::jobs) exactly once per registration,
/// on the task that called `run`, and never concurrently with another
/// manager's `jobs`. [`job_completed`](JobManager::job_completed) is then
/// called once per job, after the runner's own `JobCompleted` event for that
/// job has been delivered, from whichever task observed the completion.
pub trait JobManager: Send + Sync {
    /// Name used in logs and orchestration errors.
    fn name(&self) -> &str {
        "manager"
    }

    /// Full list of jobs to run. May be expensive.
    ///
    /// This is a blocking call. On a multi-thread runtime the runner moves it
    /// off the async worker with `block_in_place`; on a current-thread runtime
    /// it stalls already launched jobs until it returns.
    ///
    /// An `Err` is recorded as an orchestration fault on the runner; the
    /// manager then contributes no jobs.
    fn jobs(&self) -> anyhow::Result<Vec<Arc<dyn RunnableJob>>>;

    fn job_completed(&self, completion: &JobCompletion);
}
