// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod job;
pub mod logging;

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::engine::JobRunner;
use crate::exec::{CommandJobManager, managers_from_config};

pub use crate::engine::{BatchCompletion, JobCompletion, JobOutcome, RunnerEvent};
pub use crate::job::{JobManager, JobProgress, RunnableJob};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one command-job manager per config group
/// - the job runner, with periodic status logging
/// - Ctrl-C handling (stops the batch)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let managers = managers_from_config(&cfg)?;
    let runner = JobRunner::new();
    for manager in &managers {
        runner.add(Arc::clone(manager) as Arc<dyn JobManager>);
    }

    let interval = Duration::from_millis(cfg.config.progress_interval_ms);
    drive_batch(&runner, interval).await?;

    print_summary(&runner, &managers);

    if let Some(fault) = runner.runner_error() {
        warn!(error = %fault, "runner reported an orchestration fault");
    }

    let unsuccessful: usize = managers
        .iter()
        .map(|m| {
            let s = m.summary();
            s.failed + s.cancelled
        })
        .sum();
    if unsuccessful > 0 {
        bail!("{unsuccessful} job(s) did not succeed");
    }

    Ok(())
}

/// Run the batch to completion, logging status every `interval` and
/// stopping the runner on the first Ctrl-C.
pub async fn drive_batch(runner: &JobRunner, interval: Duration) -> Result<()> {
    let mut batch = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.run(true).await })
    };
    let mut ctrl_c = pin!(tokio::signal::ctrl_c());
    let mut ticker = tokio::time::interval(interval);
    let mut listening = true;

    loop {
        tokio::select! {
            res = &mut batch => {
                res?;
                break;
            }

            _ = ticker.tick() => {
                info!(
                    status = %runner.status(),
                    progress = %format!("{:.1}%", runner.progress() * 100.0),
                    "batch progress"
                );
            }

            sig = &mut ctrl_c, if listening => {
                listening = false;
                match sig {
                    Ok(()) => {
                        info!("Ctrl+C received; stopping batch");
                        runner.stop();
                    }
                    Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
                }
            }
        }
    }

    Ok(())
}

fn print_summary(runner: &JobRunner, managers: &[Arc<CommandJobManager>]) {
    let elapsed = runner.elapsed_time().unwrap_or_default();
    println!("{} in {:.2?}", runner.status(), elapsed);

    for manager in managers {
        let s = manager.summary();
        println!(
            "  {}: {} succeeded, {} failed, {} cancelled",
            manager.name(),
            s.succeeded,
            s.failed,
            s.cancelled
        );
    }
}

/// Simple dry-run output: print groups, jobs and commands.
fn print_dry_run(cfg: &ConfigFile) {
    println!("jobrunner dry-run");
    println!(
        "  config.progress_interval_ms = {}",
        cfg.config.progress_interval_ms
    );
    println!();

    for (group, jobs) in cfg.groups() {
        println!("group {group} ({} jobs):", jobs.len());
        for (name, job) in jobs {
            println!("  - {name}");
            println!("      cmd: {}", job.cmd);
            if let Some(pattern) = job.effective_progress_pattern(&cfg.default) {
                println!(
                    "      progress_pattern: {pattern} (percent: {})",
                    job.effective_progress_is_percent(&cfg.default)
                );
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
