// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Name of the group jobs fall into when they do not set `group`.
pub const DEFAULT_GROUP: &str = "default";

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// progress_interval_ms = 500
///
/// [default]
/// progress_pattern = '^progress: (\d+(?:\.\d+)?)%$'
///
/// [job.build]
/// cmd = "make"
/// group = "compile"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub default: DefaultSection,

    /// All jobs from `[job.<name>]`, keyed by job name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub default: DefaultSection,
    pub job: BTreeMap<String, JobConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        default: DefaultSection,
        job: BTreeMap<String, JobConfig>,
    ) -> Self {
        Self {
            config,
            default,
            job,
        }
    }

    /// Jobs grouped by manager, groups ordered by first appearance when jobs
    /// are walked in name order.
    pub fn groups(&self) -> Vec<(String, Vec<(&str, &JobConfig)>)> {
        let mut groups: Vec<(String, Vec<(&str, &JobConfig)>)> = Vec::new();

        for (name, job) in self.job.iter() {
            let group = job.effective_group();
            match groups.iter_mut().find(|(g, _)| g == group) {
                Some((_, jobs)) => jobs.push((name.as_str(), job)),
                None => groups.push((group.to_string(), vec![(name.as_str(), job)])),
            }
        }

        groups
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// How often the CLI logs batch status while jobs run.
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

fn default_progress_interval_ms() -> u64 {
    500
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

/// `[default]` section: values jobs inherit unless they override them.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    #[serde(default)]
    pub progress_pattern: Option<String>,

    /// If `None`, progress captures are read as percentages.
    #[serde(default)]
    pub progress_is_percent: Option<bool>,
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Shell command to execute.
    pub cmd: String,

    /// Manager this job belongs to; see [`DEFAULT_GROUP`].
    #[serde(default)]
    pub group: Option<String>,

    /// Regex with one capture group holding the progress number.
    #[serde(default)]
    pub progress_pattern: Option<String>,

    #[serde(default)]
    pub progress_is_percent: Option<bool>,
}

impl JobConfig {
    pub fn effective_group(&self) -> &str {
        self.group.as_deref().unwrap_or(DEFAULT_GROUP)
    }

    pub fn effective_progress_pattern<'a>(&'a self, default: &'a DefaultSection) -> Option<&'a str> {
        self.progress_pattern
            .as_deref()
            .or(default.progress_pattern.as_deref())
    }

    pub fn effective_progress_is_percent(&self, default: &DefaultSection) -> bool {
        self.progress_is_percent
            .or(default.progress_is_percent)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(cmd: &str, group: Option<&str>) -> JobConfig {
        JobConfig {
            cmd: cmd.to_string(),
            group: group.map(str::to_string),
            progress_pattern: None,
            progress_is_percent: None,
        }
    }

    #[test]
    fn groups_follow_first_appearance_in_name_order() {
        let mut jobs = BTreeMap::new();
        jobs.insert("c".to_string(), job("echo c", Some("x")));
        jobs.insert("a".to_string(), job("echo a", Some("y")));
        jobs.insert("b".to_string(), job("echo b", None));
        jobs.insert("d".to_string(), job("echo d", Some("y")));

        let cfg = ConfigFile::new_unchecked(ConfigSection::default(), DefaultSection::default(), jobs);
        let groups = cfg.groups();

        let summary: Vec<(&str, Vec<&str>)> = groups
            .iter()
            .map(|(g, jobs)| (g.as_str(), jobs.iter().map(|(n, _)| *n).collect()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("y", vec!["a", "d"]),
                ("default", vec!["b"]),
                ("x", vec!["c"]),
            ]
        );
    }

    #[test]
    fn job_overrides_default_section() {
        let default = DefaultSection {
            progress_pattern: Some("d=(\\d+)".to_string()),
            progress_is_percent: Some(false),
        };
        let mut j = job("true", None);
        assert_eq!(j.effective_progress_pattern(&default), Some("d=(\\d+)"));
        assert!(!j.effective_progress_is_percent(&default));

        j.progress_pattern = Some("j=(\\d+)".to_string());
        j.progress_is_percent = Some(true);
        assert_eq!(j.effective_progress_pattern(&default), Some("j=(\\d+)"));
        assert!(j.effective_progress_is_percent(&default));
        assert!(j.effective_progress_is_percent(&DefaultSection::default()));
    }
}
