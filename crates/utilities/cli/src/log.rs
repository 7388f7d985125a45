//! Logging flags and the [`LogConfig`] they resolve to.

use crate::LogFormat;
use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// How often the log file is rotated.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate every minute.
    Minutely,
    /// Rotate every hour.
    Hourly,
    /// Rotate every day.
    Daily,
    /// Never rotate.
    #[default]
    Never,
}

/// Global logging arguments.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity level. `-v` logs at debug level, `-vv` at trace level.
    #[arg(short = 'v', global = true, action = ArgAction::Count)]
    pub level: u8,
    /// Silences stdout logs.
    #[arg(long = "logs.stdout.quiet", short = 'q', global = true)]
    pub stdout_quiet: bool,
    /// Format of stdout logs.
    #[arg(long = "logs.stdout.format", default_value = "full", env = "LOGS_STDOUT_FORMAT")]
    pub stdout_format: LogFormat,
    /// Directory to write log files to. File logging is off when unset.
    #[arg(long = "logs.file.directory", env = "LOGS_FILE_DIRECTORY")]
    pub file_directory: Option<PathBuf>,
    /// Format of file logs.
    #[arg(long = "logs.file.format", default_value = "full", env = "LOGS_FILE_FORMAT")]
    pub file_format: LogFormat,
    /// Rotation of the log file.
    #[arg(long = "logs.file.rotation", default_value = "never", env = "LOGS_FILE_ROTATION")]
    pub file_rotation: LogRotation,
}

impl LogArgs {
    /// The global level filter selected by the verbosity flags.
    pub const fn level_filter(&self) -> LevelFilter {
        match self.level {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

/// Configuration of stdout logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdoutLogConfig {
    /// Format of the logs.
    pub format: LogFormat,
}

/// Configuration of file logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogConfig {
    /// Directory the log files are written to.
    pub directory_path: PathBuf,
    /// Format of the logs.
    pub format: LogFormat,
    /// Rotation of the log file.
    pub rotation: LogRotation,
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level applied on top of the environment filter.
    pub global_level: LevelFilter,
    /// Stdout logs, if enabled.
    pub stdout_logs: Option<StdoutLogConfig>,
    /// File logs, if enabled.
    pub file_logs: Option<FileLogConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global_level: LevelFilter::INFO,
            stdout_logs: Some(StdoutLogConfig { format: LogFormat::Full }),
            file_logs: None,
        }
    }
}

impl LogConfig {
    /// Resolves the logging configuration from CLI arguments.
    pub fn new(args: LogArgs) -> Self {
        let global_level = args.level_filter();
        let stdout_logs =
            (!args.stdout_quiet).then_some(StdoutLogConfig { format: args.stdout_format });
        let file_logs = args.file_directory.map(|directory_path| FileLogConfig {
            directory_path,
            format: args.file_format,
            rotation: args.file_rotation,
        });
        Self { global_level, stdout_logs, file_logs }
    }
}

impl From<LogArgs> for LogConfig {
    fn from(args: LogArgs) -> Self {
        Self::new(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rstest::rstest;

    #[derive(Parser, Debug)]
    struct MockCommand {
        #[command(flatten)]
        logs: LogArgs,
    }

    #[rstest]
    #[case::default(&["test"], LevelFilter::INFO)]
    #[case::debug(&["test", "-v"], LevelFilter::DEBUG)]
    #[case::trace(&["test", "-vv"], LevelFilter::TRACE)]
    #[case::capped(&["test", "-vvvvv"], LevelFilter::TRACE)]
    fn test_verbosity(#[case] args: &[&str], #[case] expected: LevelFilter) {
        let command = MockCommand::parse_from(args);
        assert_eq!(command.logs.level_filter(), expected);
    }

    #[test]
    fn test_default_args_log_to_stdout_only() {
        let command = MockCommand::parse_from(["test"]);
        assert_eq!(LogConfig::new(command.logs), LogConfig::default());
    }

    #[test]
    fn test_quiet_with_file_logs() {
        let command = MockCommand::parse_from([
            "test",
            "-q",
            "--logs.file.directory",
            "/var/log/bridge",
            "--logs.file.format",
            "json",
            "--logs.file.rotation",
            "daily",
        ]);
        let config = LogConfig::from(command.logs);

        assert!(config.stdout_logs.is_none());
        assert_eq!(
            config.file_logs,
            Some(FileLogConfig {
                directory_path: PathBuf::from("/var/log/bridge"),
                format: LogFormat::Json,
                rotation: LogRotation::Daily,
            })
        );
    }
}
