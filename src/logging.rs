//! Diagnostic logging setup.
//!
//! The terminal is in raw mode while a session runs, so explicit log output
//! goes to a file instead of interleaving with the remote shell.

use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "SSHYA_LOG";

pub const DEFAULT_FILTER: &str = "sshya=warn";

pub const LOG_FILE_NAME: &str = "sshya.log";

/// Where log lines end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Warnings and above on stderr
    Stderr,
    /// Everything the filter allows, appended to a file
    File(PathBuf),
}

/// Pick the log target. An explicit filter sends logs to `data_dir` when one
/// is known.
pub fn choose_target(filter_from_env: bool, data_dir: Option<&Path>) -> LogTarget {
    match data_dir {
        Some(dir) if filter_from_env => LogTarget::File(dir.join(LOG_FILE_NAME)),
        _ => LogTarget::Stderr,
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(data_dir: Option<&Path>) -> Result<LogTarget> {
    let env_filter = env::var(LOG_ENV).ok().filter(|s| !s.trim().is_empty());
    let target = choose_target(env_filter.is_some(), data_dir);

    let filter = env_filter
        .as_deref()
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    match &target {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .with(filter)
                .try_init();
        }
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            let _ = tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init();
        }
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_target_is_stderr() {
        assert_eq!(choose_target(false, Some(Path::new("/data"))), LogTarget::Stderr);
    }

    #[test]
    fn explicit_filter_logs_to_file() {
        assert_eq!(
            choose_target(true, Some(Path::new("/data/sshya"))),
            LogTarget::File(PathBuf::from("/data/sshya/sshya.log"))
        );
    }

    #[test]
    fn explicit_filter_without_data_dir_falls_back_to_stderr() {
        assert_eq!(choose_target(true, None), LogTarget::Stderr);
    }
}
