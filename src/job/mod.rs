// src/job/mod.rs

//! Job and job-manager abstractions consumed by the runner.
//!
//! - [`RunnableJob`] is one unit of work: readable progress plus an async
//!   entry point that receives the runner's shared cancellation token.
//! - [`JobManager`] owns a set of jobs, hands them to the runner once, and is
//!   told about each job's completion.
//! - [`progress`] provides [`JobProgress`], a lock-free monotone progress
//!   cell that job implementations can embed.

pub mod manager;
pub mod progress;

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

pub use manager::JobManager;
pub use progress::JobProgress;

/// Future returned by [`RunnableJob::run`].
pub type JobFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// A unit of work the runner can execute.
///
/// Implementations must keep `progress` cheap and thread-safe: the runner
/// polls it from whichever thread asks for aggregate progress, without any
/// lock of its own.
pub trait RunnableJob: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        "job"
    }

    /// Fraction complete in `[0, 1]`. Must never decrease.
    fn progress(&self) -> f64;

    /// Execute the job to completion.
    ///
    /// Returning `Err` marks the job failed. Jobs should watch `cancel` and
    /// return early (conventionally with [`crate::errors::JobCancelled`])
    /// once it fires; the runner never aborts a job forcibly.
    fn run(&self, cancel: CancellationToken) -> JobFuture<'_>;
}
