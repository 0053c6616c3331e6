//! Fake jobs with controllable timing, progress and failure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use jobrunner::errors::JobCancelled;
use jobrunner::job::{JobFuture, JobProgress, RunnableJob};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Sleeps for `duration`, raising progress linearly over `steps` steps.
/// Stops early with `JobCancelled` if the token fires.
pub struct SleepJob {
    name: String,
    duration: Duration,
    steps: u32,
    progress: JobProgress,
    runs: AtomicUsize,
}

impl SleepJob {
    pub fn new(name: &str, duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            duration,
            steps: 5,
            progress: JobProgress::new(),
            runs: AtomicUsize::new(0),
        })
    }

    /// How many times `run` was entered.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl RunnableJob for SleepJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn progress(&self) -> f64 {
        self.progress.get()
    }

    fn run(&self, cancel: CancellationToken) -> JobFuture<'_> {
        Box::pin(async move {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let step = self.duration / self.steps;
            for i in 1..=self.steps {
                tokio::select! {
                    _ = tokio::time::sleep(step) => {}
                    _ = cancel.cancelled() => return Err(anyhow::Error::from(JobCancelled)),
                }
                self.progress.set(i as f64 / self.steps as f64);
            }
            Ok(())
        })
    }
}

/// Fails immediately with the error built by `make_error`.
pub struct FailingJob {
    name: String,
    make_error: Box<dyn Fn() -> anyhow::Error + Send + Sync>,
}

impl FailingJob {
    pub fn new<F>(name: &str, make_error: F) -> Arc<Self>
    where
        F: Fn() -> anyhow::Error + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.to_string(),
            make_error: Box::new(make_error),
        })
    }
}

impl RunnableJob for FailingJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn progress(&self) -> f64 {
        0.0
    }

    fn run(&self, _cancel: CancellationToken) -> JobFuture<'_> {
        Box::pin(async move { Err::<(), anyhow::Error>((self.make_error)()) })
    }
}

/// Panics when run.
pub struct PanickingJob;

impl RunnableJob for PanickingJob {
    fn name(&self) -> &str {
        "panicking"
    }

    fn progress(&self) -> f64 {
        0.0
    }

    #[allow(unreachable_code)]
    fn run(&self, _cancel: CancellationToken) -> JobFuture<'_> {
        Box::pin(async move {
            panic!("job exploded");
            Ok::<(), anyhow::Error>(())
        })
    }
}

/// Blocks until cancelled and records that it saw the signal.
#[derive(Default)]
pub struct CancellationProbeJob {
    started: Notify,
    has_started: AtomicBool,
    saw_cancel: AtomicBool,
}

impl CancellationProbeJob {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn saw_cancel(&self) -> bool {
        self.saw_cancel.load(Ordering::SeqCst)
    }

    /// Resolves once `run` has been entered.
    pub async fn wait_started(&self) {
        let notified = self.started.notified();
        if self.has_started.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }
}

impl RunnableJob for CancellationProbeJob {
    fn name(&self) -> &str {
        "cancellation-probe"
    }

    fn progress(&self) -> f64 {
        0.0
    }

    fn run(&self, cancel: CancellationToken) -> JobFuture<'_> {
        Box::pin(async move {
            self.has_started.store(true, Ordering::SeqCst);
            self.started.notify_waiters();
            cancel.cancelled().await;
            self.saw_cancel.store(true, Ordering::SeqCst);
            Err(anyhow::Error::from(JobCancelled))
        })
    }
}

/// Waits for cancellation, then takes `linger` to wind down before
/// returning `JobCancelled`.
pub struct LingeringJob {
    linger: Duration,
    exited: AtomicBool,
}

impl LingeringJob {
    pub fn new(linger: Duration) -> Arc<Self> {
        Arc::new(Self {
            linger,
            exited: AtomicBool::new(false),
        })
    }

    /// Whether `run` has returned.
    pub fn exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }
}

impl RunnableJob for LingeringJob {
    fn name(&self) -> &str {
        "lingering"
    }

    fn progress(&self) -> f64 {
        0.0
    }

    fn run(&self, cancel: CancellationToken) -> JobFuture<'_> {
        Box::pin(async move {
            cancel.cancelled().await;
            tokio::time::sleep(self.linger).await;
            self.exited.store(true, Ordering::SeqCst);
            Err(anyhow::Error::from(JobCancelled))
        })
    }
}

/// Runs until released by the test; progress is set by the test.
#[derive(Default)]
pub struct GatedJob {
    gate: Notify,
    progress: JobProgress,
}

impl GatedJob {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_progress(&self, value: f64) {
        self.progress.set(value);
    }

    /// Let the job finish successfully. Safe to call before the job starts.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

impl RunnableJob for GatedJob {
    fn name(&self) -> &str {
        "gated"
    }

    fn progress(&self) -> f64 {
        self.progress.get()
    }

    fn run(&self, _cancel: CancellationToken) -> JobFuture<'_> {
        Box::pin(async move {
            self.gate.notified().await;
            self.progress.finish();
            Ok(())
        })
    }
}
