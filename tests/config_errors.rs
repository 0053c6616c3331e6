// tests/config_errors.rs

use std::io::Write;
use tempfile::NamedTempFile;
use jobrunner::config::load_and_validate;
use jobrunner::errors::JobRunnerError;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn valid_config_loads_with_defaults() {
    let file = config_file(
        r#"
[default]
progress_pattern = '^progress: (\d+)%$'

[job.render]
cmd = "echo render"
group = "frames"

[job.encode]
cmd = "echo encode"
progress_is_percent = false
"#,
    );

    let cfg = load_and_validate(file.path()).expect("valid config");
    assert_eq!(cfg.config.progress_interval_ms, 500);
    assert_eq!(cfg.job.len(), 2);

    let groups: Vec<String> = cfg.groups().into_iter().map(|(g, _)| g).collect();
    assert_eq!(groups, vec!["default".to_string(), "frames".to_string()]);

    let encode = &cfg.job["encode"];
    assert_eq!(
        encode.effective_progress_pattern(&cfg.default),
        Some(r"^progress: (\d+)%$")
    );
    assert!(!encode.effective_progress_is_percent(&cfg.default));
}

#[test]
fn config_without_jobs_is_rejected() {
    let file = config_file("[config]\nprogress_interval_ms = 100\n");

    match load_and_validate(file.path()) {
        Err(JobRunnerError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn empty_command_is_rejected() {
    let file = config_file("[job.A]\ncmd = \"   \"\n");

    match load_and_validate(file.path()) {
        Err(JobRunnerError::ConfigError(msg)) => {
            assert!(msg.contains("'A'"));
            assert!(msg.contains("empty `cmd`"));
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn zero_interval_is_rejected() {
    let file = config_file("[config]\nprogress_interval_ms = 0\n\n[job.A]\ncmd = \"true\"\n");

    match load_and_validate(file.path()) {
        Err(JobRunnerError::ConfigError(msg)) => assert!(msg.contains("progress_interval_ms")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn invalid_progress_regex_is_rejected() {
    let file = config_file("[job.A]\ncmd = \"true\"\nprogress_pattern = \"(unclosed\"\n");

    match load_and_validate(file.path()) {
        Err(JobRunnerError::PatternError { job, .. }) => assert_eq!(job, "A"),
        other => panic!("Expected PatternError, got: {:?}", other),
    }
}

#[test]
fn progress_pattern_needs_capture_group() {
    let file = config_file("[job.A]\ncmd = \"true\"\nprogress_pattern = \"^progress\"\n");

    match load_and_validate(file.path()) {
        Err(JobRunnerError::ConfigError(msg)) => assert!(msg.contains("capture group")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = config_file("[job.A\ncmd = ");

    assert!(matches!(
        load_and_validate(file.path()),
        Err(JobRunnerError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        load_and_validate("/definitely/not/here/Jobs.toml"),
        Err(JobRunnerError::IoError(_))
    ));
}
