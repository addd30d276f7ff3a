//! Tracing setup.
//!
//! The terminal UI owns stdout, so in TUI mode logs go to a per-launch file
//! under the platform data directory. Headless modes log to stderr.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

const MAX_LOG_FILES: usize = 5;
const LOG_FILE_PREFIX: &str = "foodfacts-dashboard";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Failures while setting up logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The platform has no local data directory to hold log files.
    #[error("No suitable data directory available for logs")]
    NoDataDir,
    /// The log directory could not be created.
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Listing the log directory for pruning failed.
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// An old log file could not be deleted.
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The launch timestamp could not be rendered into a file name.
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    /// Another global subscriber was already installed.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Where log lines end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    File,
    Stderr,
}

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Returns the log file path in file mode.
pub fn init(target: LogTarget, default_filter: &str) -> Result<Option<PathBuf>, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let timer = build_timer();

    match target {
        LogTarget::Stderr => {
            let layer = fmt::layer().with_timer(timer).with_writer(std::io::stderr);
            let subscriber = Registry::default().with(env_filter).with(layer);
            tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
            Ok(None)
        }
        LogTarget::File => {
            let log_dir = log_directory()?;
            let file_name = format_log_file_name(now_local_or_utc())?;
            let log_path = log_dir.join(&file_name);
            prune_old_logs(&log_dir, MAX_LOG_FILES.saturating_sub(1))?;

            let (writer, guard) = tracing_appender::non_blocking(rolling::never(&log_dir, file_name));
            let layer = fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(writer);
            let subscriber = Registry::default().with(env_filter).with(layer);
            tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
            let _ = LOG_GUARD.set(guard);

            tracing::info!("Logging initialized; log file at {}", log_path.display());
            Ok(Some(log_path))
        }
    }
}

fn log_directory() -> Result<PathBuf, LoggingError> {
    let dir = dirs::data_local_dir()
        .ok_or(LoggingError::NoDataDir)?
        .join(LOG_FILE_PREFIX)
        .join("logs");
    fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Keep at most `max_files` `.log` files in `dir`, removing the oldest first.
fn prune_old_logs(dir: &Path, max_files: usize) -> Result<(), LoggingError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("log"))
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|(modified, _)| *modified);
    let excess = entries.len().saturating_sub(max_files);
    for (_, path) in entries.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn format_log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let name = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}_{name}.log"))
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
