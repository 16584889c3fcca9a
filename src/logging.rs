use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::UtcOffset;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{reload::Handle, EnvFilter};

/// First line holds the filter, e.g. `info,predictive_heating=debug`
pub const LOG_FILTER_FILE: &str = "logging.env";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to read {0:?}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("{0:?} is empty")]
    Empty(PathBuf),
    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to initialize logger: {0}")]
    Init(String),
    #[error("failed to reload filter: {0}")]
    ReloadFailed(#[from] tracing_subscriber::reload::Error),
}

pub struct LoggingHandle<L, S> {
    filter_file: PathBuf,
    _non_blocking_guard: WorkerGuard,
    handle: Handle<L, S>,
}

/// Logs to stdout through a non blocking writer. Both `log` and `tracing` records are captured.
pub fn init_logging(filter_file: PathBuf) -> Result<LoggingHandle<EnvFilter, impl Subscriber>, LoggingError> {
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        UtcOffset::current_local_offset().unwrap_or_else(|err| {
            eprintln!("Failed to get timezone: {}", err);
            UtcOffset::UTC
        }),
        time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second] +[offset_hour]"),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());

    let env_filter = read_env_filter(&filter_file).unwrap_or_else(|err| {
        eprintln!("{}, using environment variable or default", err);
        EnvFilter::builder().with_default_directive(Level::DEBUG.into()).from_env_lossy()
    });
    println!("Env Filter: {}", env_filter);

    let builder = tracing_subscriber::fmt()
        .with_timer(timer)
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_filter_reloading();
    let handle = builder.reload_handle();

    tracing::subscriber::set_global_default(builder.finish()).map_err(|err| LoggingError::Init(err.to_string()))?;
    tracing_log::LogTracer::init().map_err(|err| LoggingError::Init(err.to_string()))?;

    Ok(LoggingHandle {
        filter_file,
        _non_blocking_guard: guard,
        handle,
    })
}

/// Re-read the filter file, returning the filter now in use.
pub fn reload_log_level(logging_handle: &LoggingHandle<EnvFilter, impl Subscriber>) -> Result<String, LoggingError> {
    let new_filter = read_env_filter(&logging_handle.filter_file)?;
    let filter_string = new_filter.to_string();
    logging_handle.handle.reload(new_filter)?;
    Ok(filter_string)
}

fn read_env_filter(filter_file: &Path) -> Result<EnvFilter, LoggingError> {
    let s = fs::read_to_string(filter_file).map_err(|err| LoggingError::Read(filter_file.to_owned(), err))?;
    let first_line = s.lines().next().ok_or_else(|| LoggingError::Empty(filter_file.to_owned()))?;
    Ok(EnvFilter::builder().with_default_directive(Level::DEBUG.into()).parse(first_line)?)
}
