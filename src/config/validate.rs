// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{JobRunnerError, Result};
use crate::exec::ProgressPattern;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::JobRunnerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.default, raw.job))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_jobs(cfg)?;
    validate_global_config(cfg)?;
    validate_job_commands(cfg)?;
    validate_progress_patterns(cfg)?;
    Ok(())
}

fn ensure_has_jobs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(JobRunnerError::ConfigError(
            "config must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.progress_interval_ms == 0 {
        return Err(JobRunnerError::ConfigError(
            "[config].progress_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_job_commands(cfg: &RawConfigFile) -> Result<()> {
    for (name, job) in cfg.job.iter() {
        if job.cmd.trim().is_empty() {
            return Err(JobRunnerError::ConfigError(format!(
                "job '{}' has an empty `cmd`",
                name
            )));
        }
        if let Some(group) = &job.group {
            if group.trim().is_empty() {
                return Err(JobRunnerError::ConfigError(format!(
                    "job '{}' has an empty `group`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_progress_patterns(cfg: &RawConfigFile) -> Result<()> {
    for (name, job) in cfg.job.iter() {
        let Some(pattern) = job.effective_progress_pattern(&cfg.default) else {
            continue;
        };

        let compiled = ProgressPattern::new(pattern, job.effective_progress_is_percent(&cfg.default))
            .map_err(|source| JobRunnerError::PatternError {
                job: name.clone(),
                source,
            })?;

        if !compiled.has_capture_group() {
            return Err(JobRunnerError::ConfigError(format!(
                "progress pattern for job '{}' needs a capture group holding the value",
                name
            )));
        }
    }
    Ok(())
}
