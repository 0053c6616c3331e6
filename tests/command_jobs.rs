// tests/command_jobs.rs

#![cfg(unix)]

mod common;
use crate::common::builders::{ConfigFileBuilder, JobConfigBuilder};
use crate::common::{batch_receiver, init_tracing, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use jobrunner::engine::JobRunner;
use jobrunner::errors::CommandFailed;
use jobrunner::exec::{CommandJob, CommandJobManager, GroupSummary, ProgressPattern, managers_from_config};
use jobrunner::job::{JobManager, RunnableJob};

fn percent_pattern() -> ProgressPattern {
    ProgressPattern::new(r"^progress: (\d+(?:\.\d+)?)%$", true).unwrap()
}

#[tokio::test]
async fn successful_command_finishes_with_full_progress() {
    init_tracing();

    let runner = JobRunner::new();
    let manager = Arc::new(CommandJobManager::new(
        "ok",
        vec![CommandJob::new("echo", "echo hello").with_progress_pattern(percent_pattern())],
    ));
    runner.add(manager.clone());

    with_timeout(runner.run(true)).await;

    assert_eq!(
        manager.summary(),
        GroupSummary {
            succeeded: 1,
            failed: 0,
            cancelled: 0
        }
    );
    assert_eq!(manager.command_jobs()[0].progress(), 1.0);
    assert_eq!(runner.status(), "1 of 1 completed");
}

#[tokio::test]
async fn failing_command_reports_exit_code() {
    init_tracing();

    let runner = JobRunner::new();
    let manager = Arc::new(CommandJobManager::new(
        "bad",
        vec![CommandJob::new("exit3", "exit 3")],
    ));
    runner.add(manager.clone());

    let failures = Arc::new(std::sync::Mutex::new(Vec::new()));
    {
        let failures = failures.clone();
        runner.on_event(move |event| {
            if let jobrunner::RunnerEvent::JobCompleted(c) = event {
                if let Some(err) = c.error() {
                    failures.lock().unwrap().push(err.downcast_ref::<CommandFailed>().copied());
                }
            }
        });
    }

    with_timeout(runner.run(true)).await;

    assert_eq!(*failures.lock().unwrap(), vec![Some(CommandFailed { code: 3 })]);
    assert_eq!(manager.summary().failed, 1);
    assert!(!manager.summary().all_succeeded());
}

#[tokio::test]
async fn progress_lines_advance_progress_and_stop_kills_the_process() {
    init_tracing();

    let runner = JobRunner::new();
    let mut batches = batch_receiver(&runner);

    let job = CommandJob::new("long", "echo 'progress: 40%'; sleep 30")
        .with_progress_pattern(percent_pattern());
    let manager = Arc::new(CommandJobManager::new("long", vec![job]));
    runner.add(manager.clone());

    with_timeout(runner.run(false)).await;

    let command_job = manager.command_jobs()[0].clone();
    with_timeout(async {
        while command_job.progress() < 0.4 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!((runner.progress() - 0.4).abs() < 1e-9);

    runner.stop();
    let batch = with_timeout(batches.recv()).await.expect("batch completion");
    assert_eq!(batch.failed_jobs, 1);
    assert_eq!(manager.summary().cancelled, 1);
    assert!((command_job.progress() - 0.4).abs() < 1e-9);
}

#[tokio::test]
async fn config_groups_become_managers() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_default_progress_pattern(r"^p=([0-9.]+)$", false)
        .with_job("a", JobConfigBuilder::new("echo a").group("first").build())
        .with_job("b", JobConfigBuilder::new("echo b").build())
        .with_job("c", JobConfigBuilder::new("echo c").group("first").build())
        .build();

    let managers = managers_from_config(&cfg).unwrap();
    let names: Vec<&str> = managers.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["first", "default"]);

    let first_jobs: Vec<&str> = managers[0].command_jobs().iter().map(|j| j.name()).collect();
    assert_eq!(first_jobs, vec!["a", "c"]);
    assert_eq!(
        managers[0].command_jobs()[0].progress_pattern().map(|p| p.as_str()),
        Some(r"^p=([0-9.]+)$")
    );

    let runner = JobRunner::new();
    for m in &managers {
        runner.add(m.clone());
    }
    with_timeout(runner.run(true)).await;

    assert_eq!(runner.status(), "3 of 3 completed");
    assert!(managers.iter().all(|m| m.summary().all_succeeded()));
    assert!(
        managers
            .iter()
            .flat_map(|m| m.command_jobs().iter())
            .all(|j| j.progress() == 1.0)
    );
}
