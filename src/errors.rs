// src/errors.rs

//! Crate-wide error types.
//!
//! - [`JobRunnerError`] covers configuration and host-level failures.
//! - [`RunnerError`] describes faults in the runner's own orchestration
//!   (never a fault inside a job).
//! - [`JobCancelled`] and [`CommandFailed`] are job-level errors that jobs
//!   return from `run`; they travel inside an `anyhow::Error`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobRunnerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid progress pattern for job '{job}': {source}")]
    PatternError {
        job: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, JobRunnerError>;

/// Fault in the runner's bookkeeping or in a collaborator it calls on the
/// runner's behalf (manager, event handler).
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("manager '{manager}' failed to produce jobs: {message}")]
    JobListFailed { manager: String, message: String },

    #[error("manager '{manager}' panicked while producing jobs: {message}")]
    JobListPanicked { manager: String, message: String },

    #[error("manager '{manager}' panicked in completion callback for job '{job}': {message}")]
    ManagerCallbackPanicked {
        manager: String,
        job: String,
        message: String,
    },

    #[error("event handler panicked: {message}")]
    EventHandlerPanicked { message: String },
}

/// Returned by a job that stopped because it observed cancellation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("job cancelled")]
pub struct JobCancelled;

/// A command job exited unsuccessfully. `code` is `-1` when the process was
/// terminated by a signal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("command exited with code {code}")]
pub struct CommandFailed {
    pub code: i32,
}

/// Best-effort message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_handles_str_and_string() {
        let a: Box<dyn std::any::Any + Send> = Box::new("boom");
        let b: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        let c: Box<dyn std::any::Any + Send> = Box::new(42u8);

        assert_eq!(panic_message(a.as_ref()), "boom");
        assert_eq!(panic_message(b.as_ref()), "bang");
        assert_eq!(panic_message(c.as_ref()), "non-string panic payload");
    }

    #[test]
    fn job_errors_downcast_through_anyhow() {
        let err = anyhow::Error::new(CommandFailed { code: 3 });
        assert_eq!(err.downcast_ref::<CommandFailed>(), Some(&CommandFailed { code: 3 }));
        assert_eq!(err.to_string(), "command exited with code 3");

        let err = anyhow::Error::new(JobCancelled);
        assert!(err.downcast_ref::<JobCancelled>().is_some());
    }
}
