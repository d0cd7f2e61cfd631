//! Logger initialisation
//!
//! Log records go to two sinks: the terminal and the session's log file. Each
//! sink has its own level so that per-cycle trace output from the control loop
//! can be kept in the file without flooding the terminal.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info};
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Levels of the two log sinks, as level names (`"off"`, `"error"`, `"warn"`,
/// `"info"`, `"debug"` or `"trace"`).
#[derive(Debug, Clone, Deserialize)]
pub struct LogParams {
    pub stdout_level: String,
    pub file_level: String,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Unknown log level `{0}`")]
    UnknownLevel(String),

    #[error("Expected the file log level to be `INFO` or more verbose, found `{0}`")]
    InvalidFileLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LogParams {
    /// Parse the level names into filters, `(stdout, file)`.
    pub fn levels(&self) -> Result<(LevelFilter, LevelFilter), LoggerInitError> {
        let parse = |s: &str| {
            LevelFilter::from_str(s).map_err(|_| LoggerInitError::UnknownLevel(s.to_string()))
        };

        Ok((parse(&self.stdout_level)?, parse(&self.file_level)?))
    }
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            stdout_level: "info".into(),
            file_level: "debug".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// # Notes
///
/// - The file level must be `INFO` or more verbose, so the session header is
///   always recorded.
///
/// # Safety
///
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(params: &LogParams, session: &session::Session) -> Result<(), LoggerInitError> {
    let (stdout_level, file_level) = params.levels()?;

    if file_level < log::Level::Info {
        return Err(LoggerInitError::InvalidFileLevel(file_level));
    }

    let log_file =
        fern::log_file(session.log_file_path.clone()).map_err(LoggerInitError::LogFileInitError)?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            // Debug and trace records carry their module path
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{:10.6} {}] {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    message
                ))
            }
        })
        .level(stdout_level.max(file_level))
        .chain(fern::Dispatch::new().level(stdout_level).chain(std::io::stdout()))
        .chain(fern::Dispatch::new().level(file_level).chain(log_file))
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Ok(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Terminal level: {:?}, file level: {:?}", stdout_level, file_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Three letter tag of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info => "INF".normal(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold(),
    }
}
