// src/exec/mod.rs

//! Process-backed jobs for the command-line host.
//!
//! - [`command_job`] runs one shell command as a [`RunnableJob`](crate::job::RunnableJob),
//!   using `tokio::process::Command` and honouring the runner's cancellation
//!   token.
//! - [`progress_pattern`] turns matching stdout lines into progress values.
//! - [`command_manager`] groups command jobs per config group and tallies
//!   their outcomes.

pub mod command_job;
pub mod command_manager;
pub mod progress_pattern;

pub use command_job::CommandJob;
pub use command_manager::{CommandJobManager, GroupSummary, managers_from_config};
pub use progress_pattern::ProgressPattern;
