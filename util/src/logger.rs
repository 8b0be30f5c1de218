//! # Logging
//!
//! Records go to the console, coloured by level, and to the session's log file as plain text.
//! Every line carries the session time and the task (thread) that emitted it, since the message,
//! motor and chassis tasks all log concurrently. Debug and trace lines also name their module.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::Colorize;
use log::{self, info, Level};
use std::fmt;
use std::thread;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Cannot open the session log file: {0}")]
    LogFile(std::io::Error),

    #[error("A logger is already set: {0}")]
    Dispatch(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise logging for this run.
///
/// `min_level` must let `INFO` records through, they carry the run's status lines. Only one
/// logger can be set per process.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file = fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFile)?;

    let console = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}", format_record(record, message, true)))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}", format_record(record, message, false)))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .chain(console)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::Dispatch)?;

    info!("Logging initialised for {}", session.exec_name);
    match session::get_epoch() {
        Some(e) => info!("    Session epoch: {}", e),
        None => info!("    Session epoch: not set"),
    }
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn format_record(record: &log::Record, message: &fmt::Arguments, coloured: bool) -> String {
    let current = thread::current();

    format_line(
        session::get_elapsed_seconds(),
        record.level(),
        current.name().unwrap_or("?"),
        record.target(),
        message,
        coloured,
    )
}

/// One log line, `[time level task] message`, with the target before the message below `INFO`.
fn format_line<M: fmt::Display>(
    elapsed_s: f64,
    level: Level,
    task: &str,
    target: &str,
    message: M,
    coloured: bool,
) -> String {
    let tag = level_tag(level, coloured);

    if level > Level::Info {
        format!("[{:10.6} {} {:>12}] {}: {}", elapsed_s, tag, task, target, message)
    }
    else {
        format!("[{:10.6} {} {:>12}] {}", elapsed_s, tag, task, message)
    }
}

/// Three letter level tag.
fn level_tag(level: Level, coloured: bool) -> String {
    let tag = match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
    };

    if !coloured {
        return tag.to_string();
    }

    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info => tag.normal(),
        Level::Warn => tag.yellow(),
        Level::Error => tag.red().bold(),
    }
    .to_string()
}
