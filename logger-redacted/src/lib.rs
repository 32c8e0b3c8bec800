//! Tracing setup with automatic caller-number redaction
//!
//! Call-handling code logs freely with `tracing` (caller numbers, dialed
//! numbers, e-mail addresses typed in by staff). Every formatted line passes
//! through [`PiiRedactor`] before it reaches stdout or the rolling log file,
//! so raw phone numbers never land in a log sink.
//!
//! # Detected Data Types
//!
//! - **Indian mobiles**: 9876543210, 09876543210, +91 98765 43210
//! - **Landlines**: 011-40036376, 01140036376
//! - **Email Addresses**: user@example.com
//!
//! Redacted values become `PHONE[<hash>]` / `EMAIL[<hash>]`, where the hash is
//! a short SHA-256 prefix, so one caller can still be followed across lines.
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, LoggerConfig};
//!
//! let _guard = init_tracing(&LoggerConfig::default(), false).unwrap();
//! tracing::info!(from = "+919876543210", "Incoming call");
//! // from=PHONE[q1w2e3r4t5Y]
//! ```

pub mod config;
pub mod formatters;
pub mod redactor;
pub mod writer;

pub use config::*;
pub use formatters::{ColoredFieldFormatter, ColoredFormatter};
pub use redactor::*;
pub use writer::{RedactingMakeWriter, RedactingWriter};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

pub type LoggerResult<T> = Result<T, LoggerError>;

/// Install the global subscriber.
///
/// Returns the appender guard when logging to a directory; it must be held
/// for the life of the process or buffered lines are lost on exit.
pub fn init_tracing(config: &LoggerConfig, verbose: bool) -> LoggerResult<Option<WorkerGuard>> {
    let directive = if verbose {
        LoggerConfig {
            level: "debug".to_string(),
            ..config.clone()
        }
        .default_directive()
    } else {
        config.default_directive()
    };

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&directive)
            .map_err(|e| LoggerError::InvalidFilter(e.to_string()))?,
    };

    let (sink, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxedSink::File(non_blocking), Some(guard))
        }
        None => (BoxedSink::Stdout, None),
    };

    let writer = match (config.redact_pii, sink) {
        (true, BoxedSink::File(w)) => {
            BoxMakeWriter::new(RedactingMakeWriter::new(w, PiiRedactor::default()))
        }
        (true, BoxedSink::Stdout) => {
            BoxMakeWriter::new(RedactingMakeWriter::new(std::io::stdout, PiiRedactor::default()))
        }
        (false, BoxedSink::File(w)) => BoxMakeWriter::new(w),
        (false, BoxedSink::Stdout) => BoxMakeWriter::new(std::io::stdout),
    };

    let use_colors = !config.json
        && config.directory.is_none()
        && std::env::var("NO_COLOR").is_err()
        && atty::is(atty::Stream::Stdout);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if config.json {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(writer)
                    .json(),
            )
            .try_init()
    } else if use_colors {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_writer(writer)
                    .event_format(ColoredFormatter)
                    .fmt_fields(ColoredFieldFormatter),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(writer),
            )
            .try_init()
    };

    installed.map_err(|e| LoggerError::Init(e.to_string()))?;
    Ok(guard)
}

enum BoxedSink {
    Stdout,
    File(tracing_appender::non_blocking::NonBlocking),
}
