//! Logging for the steering executable
//!
//! Records are written to stdout and to the session's log file. The terminal shows records at the
//! requested level, while the log file is never less verbose than `DEBUG` so the per-sample
//! steering lines of a tuning run can be reviewed afterwards.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level};
use std::fmt;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Least verbose level the log file is written at.
const FILE_MIN_LEVEL: LevelFilter = LevelFilter::Debug;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Log level `{0}` would hide the executable's status messages, use `info` or more")]
    LevelTooQuiet(LevelFilter),

    #[error("Could not open the log file: {0}")]
    LogFile(std::io::Error),

    #[error("A logger has already been installed: {0}")]
    AlreadyInstalled(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Install the logger for this execution.
///
/// `min_level` is the level shown on stdout, and must be at least as verbose as `INFO`. Only one
/// logger can be installed per process.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < LevelFilter::Info {
        return Err(LoggerInitError::LevelTooQuiet(min_level))
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFile)?;

    let stdout = fern::Dispatch::new()
        .level(min_level)
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .level(min_level.max(FILE_MIN_LEVEL))
        .chain(log_file);

    fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!(
            "{}",
            format_line(
                session::get_elapsed_seconds(),
                record.level(),
                record.target(),
                message
            )
        )))
        .level(LevelFilter::Trace)
        .level_for("zmq", LevelFilter::Info)
        .chain(stdout)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::AlreadyInstalled)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Terminal level: {:?}, file level: {:?}", min_level, min_level.max(FILE_MIN_LEVEL));
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Build one log line. Debug and trace lines also name the module they came from.
fn format_line(
    elapsed_s: f64,
    level: Level,
    target: &str,
    message: &fmt::Arguments
) -> String {
    match level {
        Level::Debug | Level::Trace => format!(
            "[{:10.6} {}] {}: {}",
            elapsed_s,
            level_tag(level),
            target,
            message
        ),
        _ => format!("[{:10.6} {}] {}", elapsed_s, level_tag(level), message)
    }
}

/// Short, coloured tag for a log level
fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info  => "INF".normal(),
        Level::Warn  => "WRN".yellow(),
        Level::Error => "ERR".red().bold()
    }
}
