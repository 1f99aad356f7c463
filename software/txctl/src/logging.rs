use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Global root logger.
static LOGGING_GUARDS: OnceLock<LoggingGuards> = OnceLock::new();

/// Serializes first-time initialization between threads.
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Logger thread handles, which must be kept alive for as long as the
/// logging targets will be used. Flushed automatically when dropped.
pub(crate) struct LoggingGuards {
    _stdout: Mutex<WorkerGuard>,
    _file: Mutex<WorkerGuard>,
}

/// Set up file and terminal logging for a session.
///
/// Idempotent after the first call: a second initialization keeps the
/// existing logger and returns the existing handles.
pub(crate) fn init_logging(
    session_dir: &Path,
    session_name: &str,
) -> Result<(PathBuf, &'static LoggingGuards), String> {
    // Build file writer
    let log_dir = session_dir.join("logs");
    fs::create_dir_all(&log_dir).map_err(|e| format!("Failed to create log directory: {e}"))?;
    let log_path = log_dir.join(format!("{session_name}.log"));

    let _init = INIT_LOCK
        .lock()
        .map_err(|_| "Logging init lock poisoned".to_string())?;
    if let Some(guards) = LOGGING_GUARDS.get() {
        return Ok((log_path, guards));
    }

    let logfile = OpenOptions::new()
        .create(true)
        .truncate(false)
        .append(true)
        .open(&log_path)
        .map_err(|e| format!("Failed to create log file: {e}"))?;

    // Build terminal and file writers
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let (file_writer, file_guard) = tracing_appender::non_blocking(logfile);

    // Filter for log level
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| format!("Failed to set up logging env filter: {e}"))?;

    // Formatting for terminal logger
    let stdout_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::rfc_3339())
        .with_writer(stdout_writer)
        .with_target(false);

    // Formatting for file logger
    let file_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::rfc_3339())
        .with_writer(file_writer)
        .with_ansi(false);

    // Set up global root logger
    tracing_subscriber::registry()
        .with(file_layer)
        .with(env_filter)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {e}"))?;

    let guards = LOGGING_GUARDS.get_or_init(|| LoggingGuards {
        _stdout: Mutex::new(stdout_guard),
        _file: Mutex::new(file_guard),
    });

    Ok((log_path, guards))
}
