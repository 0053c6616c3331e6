#![allow(dead_code)]

pub use jobrunner_test_utils::builders;
pub use jobrunner_test_utils::fake_jobs;
pub use jobrunner_test_utils::fake_manager;
pub use jobrunner_test_utils::{
    EventLog, all_completed_count, batch_receiver, init_tracing, job_completed_count,
    record_events, with_timeout,
};
