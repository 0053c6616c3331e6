// src/engine/runner.rs

use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::{RunnerError, panic_message};
use crate::job::{JobManager, RunnableJob};

use super::state::RunnerState;
use super::{BatchCompletion, EventHandler, JobCompletion, JobId, RunnerEvent};

/// Runs every job produced by the registered managers, concurrently, and
/// reports per-job and whole-batch completion.
///
/// `JobRunner` is a cheap handle: clones share the same queue, state,
/// cancellation token and handlers.
///
/// - [`add`](Self::add) queues a manager.
/// - [`run`](Self::run) drains the queue in FIFO order and spawns every job
///   as its own tokio task; no concurrency limit is applied.
/// - [`stop`](Self::stop) fires the shared cancellation token.
/// - [`progress`](Self::progress) / [`status`](Self::status) are computed on
///   demand under the state lock and may be read from any thread.
#[derive(Clone, Default)]
pub struct JobRunner {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    queue: Mutex<VecDeque<Arc<dyn JobManager>>>,
    state: Mutex<RunnerState>,
    cancel: CancellationToken,
    handlers: RwLock<Vec<EventHandler>>,
    runner_error: OnceLock<Arc<RunnerError>>,
    /// Woken whenever a job's notifications or a batch announcement finish.
    settled: Notify,
}

impl fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state();
        f.debug_struct("JobRunner")
            .field("total", &state.total())
            .field("completed", &state.completed())
            .field("in_flight", &state.in_flight())
            .field("stopped", &self.inner.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl JobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a manager for the next [`run`](Self::run). No jobs are created yet.
    pub fn add(&self, manager: Arc<dyn JobManager>) {
        debug!(manager = %manager.name(), "manager queued");
        self.inner.queue().push_back(manager);
    }

    /// Register an observer for [`RunnerEvent`]s.
    ///
    /// Handlers run synchronously on the task that detected the completion,
    /// so they should be quick. A panicking handler is recorded as a runner
    /// fault and does not stop delivery to the others.
    pub fn on_event<F>(&self, handler: F)
    where
        F: Fn(&RunnerEvent) + Send + Sync + 'static,
    {
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    /// Drain the manager queue and launch every job it yields.
    ///
    /// Managers are drained one at a time in the order they were added; each
    /// manager's `jobs()` runs to completion before its jobs are launched, in
    /// the order returned. With `wait = true` this returns once every job
    /// launched on this runner (by this call or an earlier one) has finished
    /// and been reported, including the `AllCompleted` event; otherwise it
    /// returns right after the last launch.
    ///
    /// Job failures never surface here; they are attached to the job's
    /// [`JobCompletion`]. An empty queue launches nothing, but `wait = true`
    /// still waits for jobs already in flight.
    pub async fn run(&self, wait: bool) {
        if self.inner.queue().is_empty() {
            debug!("run called with no queued managers; nothing to launch");
        } else {
            self.drain_queue();
        }

        if wait {
            self.inner.wait_idle().await;
        }
    }

    fn drain_queue(&self) {
        self.inner.state().begin_run(Instant::now());
        info!("job run started");

        // Pop one at a time so managers queued while draining are included.
        loop {
            let next = self.inner.queue().pop_front();
            let Some(manager) = next else {
                break;
            };

            let jobs = self.inner.collect_jobs(&manager);
            debug!(manager = %manager.name(), jobs = jobs.len(), "launching manager jobs");

            for job in jobs {
                Inner::launch(&self.inner, job, Arc::clone(&manager));
            }
        }

        let batch = self.inner.state().end_drain(Instant::now());
        if let Some(batch) = batch {
            // Every job finished while we were still draining.
            self.inner.announce_batch(batch);
        }
    }

    /// Signal cancellation to every job launched so far. Does not wait.
    ///
    /// The token is shared by the runner for its whole life, so jobs launched
    /// by a later `run` on a stopped runner start out cancelled.
    pub fn stop(&self) {
        if !self.inner.cancel.is_cancelled() {
            info!("stop requested; cancelling running jobs");
        }
        self.inner.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Aggregate progress in `[0, 1]`; `1.0` when nothing is in flight.
    pub fn progress(&self) -> f64 {
        self.inner.state().progress()
    }

    /// Short summary, e.g. `"3 of 5 completed"`.
    pub fn status(&self) -> String {
        self.inner.state().status()
    }

    /// Duration of the most recently finished batch.
    pub fn elapsed_time(&self) -> Option<Duration> {
        self.inner.state().elapsed()
    }

    /// First orchestration fault seen by this runner, if any.
    pub fn runner_error(&self) -> Option<Arc<RunnerError>> {
        self.inner.runner_error.get().cloned()
    }

    pub fn total_jobs(&self) -> usize {
        self.inner.state().total()
    }

    pub fn completed_jobs(&self) -> usize {
        self.inner.state().completed()
    }

    pub fn failed_jobs(&self) -> usize {
        self.inner.state().failed()
    }

    pub fn in_flight_jobs(&self) -> usize {
        self.inner.state().in_flight()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Arc<dyn JobManager>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve once nothing is in flight and every notification went out.
    async fn wait_idle(&self) {
        loop {
            let mut settled = pin!(self.settled.notified());
            settled.as_mut().enable();
            if self.state().is_idle() {
                return;
            }
            settled.await;
        }
    }

    fn collect_jobs(&self, manager: &Arc<dyn JobManager>) -> Vec<Arc<dyn RunnableJob>> {
        let produce = || catch_unwind(AssertUnwindSafe(|| manager.jobs()));
        // `jobs()` may be slow; keep other workers free to run launched jobs.
        let produced = match Handle::try_current().map(|h| h.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(produce),
            _ => produce(),
        };

        match produced {
            Ok(Ok(jobs)) => jobs,
            Ok(Err(err)) => {
                self.record_fault(RunnerError::JobListFailed {
                    manager: manager.name().to_string(),
                    message: format!("{err:#}"),
                });
                Vec::new()
            }
            Err(payload) => {
                self.record_fault(RunnerError::JobListPanicked {
                    manager: manager.name().to_string(),
                    message: panic_message(payload.as_ref()),
                });
                Vec::new()
            }
        }
    }

    /// Record `job` as in flight, then spawn it.
    ///
    /// The job runs in its own task so that a panic inside it is observed by
    /// the supervising task as a `JoinError` and turned into a job failure.
    /// The supervisor is detached; [`wait_idle`](Self::wait_idle) observes it
    /// through the state instead of its handle.
    fn launch(this: &Arc<Self>, job: Arc<dyn RunnableJob>, manager: Arc<dyn JobManager>) -> JobId {
        let id = this.state().launch(Arc::clone(&job), manager);
        debug!(job_id = id, job = %job.name(), "job launched");

        let inner = Arc::clone(this);
        let cancel = this.cancel.clone();

        tokio::spawn(async move {
            let exec_job = Arc::clone(&job);
            let execution = tokio::spawn(async move { exec_job.run(cancel).await });

            let error = match execution.await {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err),
                Err(join_err) if join_err.is_panic() => {
                    let payload = join_err.into_panic();
                    Some(anyhow!("job panicked: {}", panic_message(payload.as_ref())))
                }
                Err(join_err) => Some(anyhow!("job task did not complete: {join_err}")),
            };

            inner.finish_job(id, job.name(), error);
        });

        id
    }

    /// Bookkeeping and notifications for one finished job.
    ///
    /// Order: `JobCompleted` to every handler, then the owning manager, then
    /// (if this was the last outstanding notification) `AllCompleted`.
    fn finish_job(&self, id: JobId, name: &str, error: Option<anyhow::Error>) {
        let finished = self
            .state()
            .complete(id, error.map(Arc::new), Instant::now());
        let Some((completion, manager)) = finished else {
            return;
        };

        match completion.error() {
            None => debug!(
                job_id = id,
                job = %name,
                elapsed_ms = completion.elapsed().as_millis() as u64,
                "job succeeded"
            ),
            Some(err) => warn!(
                job_id = id,
                job = %name,
                elapsed_ms = completion.elapsed().as_millis() as u64,
                error = %err,
                "job failed"
            ),
        }

        self.emit(&RunnerEvent::JobCompleted(completion.clone()));
        self.notify_manager(&manager, &completion);

        let batch = self.state().finish_delivery(Instant::now());
        match batch {
            Some(batch) => self.announce_batch(batch),
            None => self.settled.notify_waiters(),
        }
    }

    fn announce_batch(&self, batch: BatchCompletion) {
        info!(
            jobs = batch.total_jobs,
            failed = batch.failed_jobs,
            elapsed_ms = batch.elapsed.as_millis() as u64,
            "all jobs completed"
        );
        self.emit(&RunnerEvent::AllCompleted(batch));
        self.state().end_announcement();
        self.settled.notify_waiters();
    }

    fn notify_manager(&self, manager: &Arc<dyn JobManager>, completion: &JobCompletion) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| manager.job_completed(completion))) {
            self.record_fault(RunnerError::ManagerCallbackPanicked {
                manager: manager.name().to_string(),
                job: completion.job().name().to_string(),
                message: panic_message(payload.as_ref()),
            });
        }
    }

    fn emit(&self, event: &RunnerEvent) {
        // Snapshot so handlers may register further handlers without deadlock.
        let handlers: Vec<EventHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for handler in handlers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                self.record_fault(RunnerError::EventHandlerPanicked {
                    message: panic_message(payload.as_ref()),
                });
            }
        }
    }

    fn record_fault(&self, fault: RunnerError) {
        error!(error = %fault, "runner orchestration fault");
        if self.runner_error.set(Arc::new(fault)).is_err() {
            debug!("runner fault already recorded; keeping the first one");
        }
    }
}
