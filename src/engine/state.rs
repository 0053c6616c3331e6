// src/engine/state.rs

//! Locked bookkeeping for one runner.
//!
//! `RunnerState` is a plain synchronous state machine: the async shell in
//! [`super::runner`] keeps it behind a single mutex and feeds it launches and
//! completions. It performs no IO and raises no events itself; callers get
//! back the records they must deliver once the lock is released.
//!
//! Batch lifecycle:
//! - `begin_run` opens a drain (the manager queue walk).
//! - `launch` records a job as in flight and arms the batch.
//! - `complete` retires a job and opens a delivery window for its
//!   notifications.
//! - `finish_delivery` / `end_drain` close those windows; whichever closes
//!   the last one while nothing is in flight returns the batch record.
//! - `end_announcement` closes the window opened by handing out that record.
//!   The state is idle once no job is in flight and no window is open.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::job::{JobManager, RunnableJob};

use super::{BatchCompletion, JobCompletion, JobId};

/// A launched job that has not finished yet.
struct InFlightJob {
    job: Arc<dyn RunnableJob>,
    manager: Arc<dyn JobManager>,
}

/// Counters for the batch currently being assembled or executed.
#[derive(Debug, Default, Clone, Copy)]
struct ArmedBatch {
    jobs: usize,
    failed: usize,
}

#[derive(Default)]
pub struct RunnerState {
    /// Jobs launched over the runner's lifetime.
    total: usize,
    /// Jobs finished over the runner's lifetime.
    completed: usize,
    failed: usize,
    in_flight: HashMap<JobId, InFlightJob>,
    next_id: JobId,
    batch_start: Option<Instant>,
    elapsed: Option<Duration>,
    /// `run` calls still walking their manager queue.
    draining: usize,
    /// Completions whose notifications are still being delivered.
    delivering: usize,
    /// Batch records handed out but not yet announced.
    announcing: usize,
    batch: Option<ArmedBatch>,
}

impl RunnerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start of a `run` call: stamp the batch start and open a drain.
    pub fn begin_run(&mut self, now: Instant) {
        self.batch_start = Some(now);
        self.elapsed = None;
        self.draining += 1;
    }

    /// Record `job` as in flight. Must happen before the job starts running.
    pub fn launch(&mut self, job: Arc<dyn RunnableJob>, manager: Arc<dyn JobManager>) -> JobId {
        let id = self.next_id;
        self.next_id += 1;

        self.in_flight.insert(id, InFlightJob { job, manager });
        self.total += 1;
        self.batch.get_or_insert_with(ArmedBatch::default).jobs += 1;

        id
    }

    /// Retire job `id` and build its completion record.
    ///
    /// Returns the record together with the owning manager, or `None` if the
    /// id is not in flight. On `Some`, the caller owes a matching
    /// [`finish_delivery`](Self::finish_delivery).
    pub fn complete(
        &mut self,
        id: JobId,
        error: Option<Arc<anyhow::Error>>,
        now: Instant,
    ) -> Option<(JobCompletion, Arc<dyn JobManager>)> {
        let Some(entry) = self.in_flight.remove(&id) else {
            warn!(job_id = id, "completion for a job that is not in flight; ignoring");
            return None;
        };

        self.completed += 1;
        if error.is_some() {
            self.failed += 1;
            if let Some(batch) = self.batch.as_mut() {
                batch.failed += 1;
            }
        }
        self.delivering += 1;

        let elapsed = self.since_batch_start(now);
        let completion = JobCompletion::new(
            id,
            entry.job,
            entry.manager.name().to_string(),
            elapsed,
            error,
        );

        Some((completion, entry.manager))
    }

    /// Close the delivery window opened by [`complete`](Self::complete).
    pub fn finish_delivery(&mut self, now: Instant) -> Option<BatchCompletion> {
        self.delivering = self.delivering.saturating_sub(1);
        self.try_finish_batch(now)
    }

    /// Close the drain opened by [`begin_run`](Self::begin_run).
    pub fn end_drain(&mut self, now: Instant) -> Option<BatchCompletion> {
        self.draining = self.draining.saturating_sub(1);
        self.try_finish_batch(now)
    }

    fn try_finish_batch(&mut self, now: Instant) -> Option<BatchCompletion> {
        if !self.in_flight.is_empty() || self.draining > 0 || self.delivering > 0 {
            return None;
        }

        let batch = self.batch.take()?;
        let elapsed = self.since_batch_start(now);
        self.elapsed = Some(elapsed);
        self.announcing += 1;

        Some(BatchCompletion {
            elapsed,
            total_jobs: batch.jobs,
            failed_jobs: batch.failed,
        })
    }

    /// Close the window opened by a batch record returned from
    /// [`finish_delivery`](Self::finish_delivery) or
    /// [`end_drain`](Self::end_drain).
    pub fn end_announcement(&mut self) {
        self.announcing = self.announcing.saturating_sub(1);
    }

    /// No job in flight and every notification delivered.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.delivering == 0 && self.announcing == 0
    }

    fn since_batch_start(&self, now: Instant) -> Duration {
        self.batch_start
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }

    /// Aggregate progress: `1.0` when nothing is in flight, otherwise
    /// `(completed + sum of in-flight progress) / total`.
    pub fn progress(&self) -> f64 {
        if self.in_flight.is_empty() || self.total == 0 {
            return 1.0;
        }

        let running: f64 = self
            .in_flight
            .values()
            .map(|entry| entry.job.progress().clamp(0.0, 1.0))
            .sum();

        ((self.completed as f64 + running) / self.total as f64).clamp(0.0, 1.0)
    }

    pub fn status(&self) -> String {
        format!("{} of {} completed", self.completed, self.total)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Duration of the most recent finished batch; `None` while a batch is
    /// still running or before any batch finished.
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }
}
