use std::collections::BTreeMap;

use jobrunner::config::{ConfigFile, ConfigSection, DefaultSection, JobConfig, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                job: BTreeMap::new(),
            },
        }
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.config.job.insert(name.to_string(), job);
        self
    }

    pub fn with_default_progress_pattern(mut self, pattern: &str, percent: bool) -> Self {
        self.config.default.progress_pattern = Some(pattern.to_string());
        self.config.default.progress_is_percent = Some(percent);
        self
    }

    pub fn with_progress_interval_ms(mut self, ms: u64) -> Self {
        self.config.config.progress_interval_ms = ms;
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            job: JobConfig {
                cmd: cmd.to_string(),
                group: None,
                progress_pattern: None,
                progress_is_percent: None,
            },
        }
    }

    pub fn group(mut self, group: &str) -> Self {
        self.job.group = Some(group.to_string());
        self
    }

    pub fn progress_pattern(mut self, pattern: &str) -> Self {
        self.job.progress_pattern = Some(pattern.to_string());
        self
    }

    pub fn progress_is_percent(mut self, val: bool) -> Self {
        self.job.progress_is_percent = Some(val);
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}
