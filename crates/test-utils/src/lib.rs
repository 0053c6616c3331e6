pub mod builders;
pub mod fake_jobs;
pub mod fake_manager;

use std::sync::{Arc, Mutex, Once};

use jobrunner::RunnerEvent;
use jobrunner::engine::{BatchCompletion, JobRunner};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Shared log of every event the runner raises, in delivery order.
pub type EventLog = Arc<Mutex<Vec<RunnerEvent>>>;

/// Register a handler on `runner` that appends every event to the returned log.
pub fn record_events(runner: &JobRunner) -> EventLog {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    runner.on_event(move |event| sink.lock().unwrap().push(event.clone()));
    log
}

/// Number of `JobCompleted` events in `log`.
pub fn job_completed_count(log: &EventLog) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, RunnerEvent::JobCompleted(_)))
        .count()
}

/// Number of `AllCompleted` events in `log`.
pub fn all_completed_count(log: &EventLog) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, RunnerEvent::AllCompleted(_)))
        .count()
}

/// Channel receiving every `AllCompleted` record raised by `runner`.
pub fn batch_receiver(runner: &JobRunner) -> mpsc::UnboundedReceiver<BatchCompletion> {
    let (tx, rx) = mpsc::unbounded_channel();
    runner.on_event(move |event| {
        if let RunnerEvent::AllCompleted(batch) = event {
            let _ = tx.send(*batch);
        }
    });
    rx
}
