//! Job managers that record what the runner tells them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use jobrunner::engine::JobCompletion;
use jobrunner::job::{JobManager, RunnableJob};

/// Hands out a fixed job list and records every completion callback.
pub struct RecordingManager {
    name: String,
    jobs: Vec<Arc<dyn RunnableJob>>,
    jobs_calls: AtomicUsize,
    completions: Mutex<Vec<JobCompletion>>,
}

impl RecordingManager {
    pub fn new(name: &str, jobs: Vec<Arc<dyn RunnableJob>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            jobs,
            jobs_calls: AtomicUsize::new(0),
            completions: Mutex::new(Vec::new()),
        })
    }

    /// How many times the runner asked for the job list.
    pub fn jobs_calls(&self) -> usize {
        self.jobs_calls.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> Vec<JobCompletion> {
        self.completions.lock().unwrap().clone()
    }
}

impl JobManager for RecordingManager {
    fn name(&self) -> &str {
        &self.name
    }

    fn jobs(&self) -> anyhow::Result<Vec<Arc<dyn RunnableJob>>> {
        self.jobs_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.jobs.clone())
    }

    fn job_completed(&self, completion: &JobCompletion) {
        self.completions.lock().unwrap().push(completion.clone());
    }
}

/// A manager whose job list cannot be produced.
pub struct BrokenManager {
    pub panics: bool,
}

impl JobManager for BrokenManager {
    fn name(&self) -> &str {
        "broken"
    }

    fn jobs(&self) -> anyhow::Result<Vec<Arc<dyn RunnableJob>>> {
        if self.panics {
            panic!("model tree corrupted");
        }
        anyhow::bail!("model tree unavailable")
    }

    fn job_completed(&self, _completion: &JobCompletion) {}
}

/// Hands out a fixed job list and panics in every completion callback.
pub struct PanickingCallbackManager {
    jobs: Vec<Arc<dyn RunnableJob>>,
    callbacks: AtomicUsize,
}

impl PanickingCallbackManager {
    pub fn new(jobs: Vec<Arc<dyn RunnableJob>>) -> Arc<Self> {
        Arc::new(Self {
            jobs,
            callbacks: AtomicUsize::new(0),
        })
    }

    /// How many completion callbacks were entered.
    pub fn callbacks(&self) -> usize {
        self.callbacks.load(Ordering::SeqCst)
    }
}

impl JobManager for PanickingCallbackManager {
    fn name(&self) -> &str {
        "careless"
    }

    fn jobs(&self) -> anyhow::Result<Vec<Arc<dyn RunnableJob>>> {
        Ok(self.jobs.clone())
    }

    fn job_completed(&self, _completion: &JobCompletion) {
        self.callbacks.fetch_add(1, Ordering::SeqCst);
        panic!("bookkeeping bug");
    }
}
