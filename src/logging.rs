//! Subscriber setup for the replay binary. The library itself only emits events.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "engine.log";

/// Keeps the non-blocking file writer alive; drop it only at process exit
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub file_logs: bool,
    pub log_dir: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file_logs: false,
            log_dir: PathBuf::from("./logs"),
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        let file_logs = std::env::var("LETTER_MASTERY_FILE_LOGS")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        let log_dir = std::env::var("LETTER_MASTERY_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default().log_dir);
        Self { file_logs, log_dir }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}

/// Installs the global subscriber. Returns a guard when file logging is active.
///
/// A second call is a no-op apart from the returned guard, so tests and the
/// binary may both call it.
pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    init_tracing_with(log_level, &LogSettings::from_env())
}

pub fn init_tracing_with(log_level: &str, settings: &LogSettings) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    if settings.file_logs {
        match std::fs::create_dir_all(&settings.log_dir) {
            Ok(()) => {
                let file_appender =
                    RollingFileAppender::new(Rotation::DAILY, &settings.log_dir, LOG_FILE_PREFIX);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let file_layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_target(true);

                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(stdout_layer)
                    .with(file_layer)
                    .try_init();

                return Some(FileLogGuard { _guard: guard });
            }
            Err(err) => {
                eprintln!(
                    "failed to create log directory {}: {err}",
                    settings.log_dir.display()
                );
            }
        }
    }

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init();

    None
}
