// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `jobrunner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobrunner",
    version,
    about = "Run a batch of independent commands concurrently and report progress.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the batch config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Jobs.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBRUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print job groups, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["jobrunner"]).unwrap();
        assert_eq!(args.config, "Jobs.toml");
        assert!(args.log_level.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn parses_flags() {
        let args = CliArgs::try_parse_from([
            "jobrunner",
            "--config",
            "batch.toml",
            "--log-level",
            "debug",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.config, "batch.toml");
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.dry_run);
    }
}
