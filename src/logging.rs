//! Tracing setup for the server binary.
//!
//! Events are printed to stdout and mirrored into a file. `RAGCHAT_LOG_FILE` names the file
//! to append to; without it a daily-rolling `logs/ragchat.log` is used. Filtering follows
//! `RUST_LOG` and falls back to `info`.
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_VAR: &str = "RAGCHAT_LOG_FILE";
const LOG_DIR: &str = "logs";
const LOG_FILE_NAME: &str = "ragchat.log";
const DEFAULT_FILTER: &str = "info";

/// Where file logs are written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogSink {
    /// Append to an operator-chosen file.
    Append(PathBuf),
    /// Roll daily under the default log directory.
    Rolling,
}

impl LogSink {
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(LOG_FILE_VAR).map(|value| value.trim().to_string()) {
            Some(path) if !path.is_empty() => Self::Append(PathBuf::from(path)),
            _ => Self::Rolling,
        }
    }

    fn open(&self) -> Result<NonBlocking, std::io::Error> {
        let (writer, guard) = match self {
            Self::Append(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                tracing_appender::non_blocking(file)
            }
            Self::Rolling => {
                std::fs::create_dir_all(LOG_DIR)?;
                tracing_appender::non_blocking(tracing_appender::rolling::daily(
                    LOG_DIR,
                    LOG_FILE_NAME,
                ))
            }
        };
        let _ = LOG_GUARD.set(guard);
        Ok(writer)
    }
}

/// Install the global subscriber. Calling it again after a subscriber exists is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console = fmt::layer().with_target(false).compact();

    let sink = LogSink::from_lookup(|key| std::env::var(key).ok());
    let file = match sink.open() {
        Ok(writer) => Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .compact(),
        ),
        Err(err) => {
            eprintln!("File logging disabled ({sink:?}): {err}");
            None
        }
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_log_file_is_appended() {
        let sink = LogSink::from_lookup(|key| {
            (key == LOG_FILE_VAR).then(|| " /tmp/ragchat-test.log ".to_string())
        });
        assert_eq!(sink, LogSink::Append(PathBuf::from("/tmp/ragchat-test.log")));
    }

    #[test]
    fn blank_or_missing_log_file_rolls_daily() {
        assert_eq!(LogSink::from_lookup(|_| None), LogSink::Rolling);
        assert_eq!(
            LogSink::from_lookup(|_| Some("   ".to_string())),
            LogSink::Rolling
        );
    }
}
