//! Diagnostics go to stderr only: stdout carries the answer and the
//! `status` report, and callers pipe it.
//!
//! The level comes from the CLI `-v` count when given, otherwise from the
//! runtime settings (which already include `FUSBUDDY_LOG_LEVEL`). It applies
//! to this crate's targets; dependencies such as hyper and rustls stay at
//! `warn` so `-vvv` shows request shapes rather than socket chatter.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::AppError;

/// Map `-v` repetitions to a level; zero defers to `configured`.
///
///   -v      → warn
///   -vv     → info   (provider choice, masked key, fallback reason)
///   -vvv    → debug  (request sizes, response shape)
///   -vvvv+  → trace  (full request payloads)
pub fn effective_level(verbosity: u8, configured: &str) -> Result<LevelFilter, AppError> {
    match verbosity {
        0 => parse_level(configured),
        1 => Ok(LevelFilter::WARN),
        2 => Ok(LevelFilter::INFO),
        3 => Ok(LevelFilter::DEBUG),
        _ => Ok(LevelFilter::TRACE),
    }
}

pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.trim().is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}

/// Install the global subscriber, writing to stderr. Call once.
pub fn init(level: LevelFilter) -> Result<(), AppError> {
    tracing::subscriber::set_global_default(subscriber(level, std::io::stderr)?)
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

fn subscriber<W>(level: LevelFilter, writer: W) -> Result<impl tracing::Subscriber + Send + Sync + 'static, AppError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let directives = format!("warn,{}={level}", env!("CARGO_CRATE_NAME"));
    let filter = EnvFilter::try_new(&directives)
        .map_err(|e| AppError::Logger(format!("invalid filter '{directives}': {e}")))?;

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .finish())
}
