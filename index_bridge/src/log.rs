//! Logging for index translation
//!
//! Every translation step reports through one process-global [`Logger`].
//! Path decisions are logged at trace level on every draw call, so entries
//! carry `&'static str` sources and the default logger drops anything below
//! its threshold before formatting.
//!
//! Log sites use the `bridge_*!` macros with a module source string such as
//! `"index_bridge::streaming"`. Errors built by `bridge_err!` also record
//! their file and line.

use colored::{ColoredString, Colorize};
use std::fmt;
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use chrono::{DateTime, Local};

static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Sink for log entries
///
/// # Example
///
/// ```no_run
/// use index_bridge::bridge::log::{Logger, LogEntry, LogSeverity};
///
/// struct ErrorsToStderr;
///
/// impl Logger for ErrorsToStderr {
///     fn log(&self, entry: &LogEntry) {
///         if entry.severity == LogSeverity::Error {
///             eprintln!("{}: {}", entry.source, entry.message);
///         }
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// Call site of a detailed log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Module that logged (e.g. "index_bridge::translator")
    pub source: &'static str,
    pub message: String,
    /// Set for errors only
    pub location: Option<Location>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Per-draw-call decisions
    Trace,

    /// Buffer growth, cache builds and invalidations
    Debug,

    /// Policy changes such as static cache promotion
    Info,

    /// Recoverable problems (e.g. a failed unmap while unwinding)
    Warn,

    /// Errors returned to the caller
    Error,
}

impl LogSeverity {
    /// Fixed-width colored tag used by [`DefaultLogger`]
    pub fn tag(self) -> ColoredString {
        match self {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        }
    }
}

/// Console logger
///
/// Prints `[timestamp] [SEVERITY] [source] message`, followed by
/// `(file:line)` for errors. Entries below `min_severity` are dropped.
#[derive(Debug, Clone, Copy)]
pub struct DefaultLogger {
    pub min_severity: LogSeverity,
}

impl DefaultLogger {
    pub fn new(min_severity: LogSeverity) -> Self {
        Self { min_severity }
    }

    /// Console line for `entry`
    pub fn format(&self, entry: &LogEntry) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let mut line = format!(
            "[{}] [{}] [{}] {}",
            datetime.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.severity.tag(),
            entry.source.bright_blue(),
            entry.message,
        );
        if let Some(location) = entry.location {
            line.push_str(&format!(" ({})", location));
        }
        line
    }
}

impl Default for DefaultLogger {
    fn default() -> Self {
        Self::new(LogSeverity::Info)
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.severity >= self.min_severity {
            println!("{}", self.format(entry));
        }
    }
}

// ===== LOGGER REGISTRY =====

fn logger_lock() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())))
}

/// Replace the active logger
///
/// # Example
///
/// ```no_run
/// use index_bridge::bridge::log::{self, DefaultLogger, LogSeverity};
///
/// // Show every path decision
/// log::set_logger(DefaultLogger::new(LogSeverity::Trace));
/// ```
pub fn set_logger<L: Logger + 'static>(logger: L) {
    if let Ok(mut lock) = logger_lock().write() {
        *lock = Box::new(logger);
    }
}

/// Restore the default console logger
pub fn reset_logger() {
    if let Ok(mut lock) = logger_lock().write() {
        *lock = Box::new(DefaultLogger::default());
    }
}

/// Dispatch an entry to the active logger (used by the `bridge_*!` macros)
pub fn log(severity: LogSeverity, source: &'static str, message: String) {
    dispatch(severity, source, message, None);
}

/// Same as [`log`] with the call site attached
pub fn log_detailed(
    severity: LogSeverity,
    source: &'static str,
    message: String,
    file: &'static str,
    line: u32,
) {
    dispatch(severity, source, message, Some(Location { file, line }));
}

fn dispatch(severity: LogSeverity, source: &'static str, message: String, location: Option<Location>) {
    if let Ok(logger) = logger_lock().read() {
        logger.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source,
            message,
            location,
        });
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
///
/// # Example
///
/// ```ignore
/// bridge_trace!("index_bridge::translator", "Selected path {:?}", path);
/// ```
#[macro_export]
macro_rules! bridge_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log($crate::bridge::log::LogSeverity::Trace, $source, format!($($arg)*))
    };
}

/// Log a DEBUG message
#[macro_export]
macro_rules! bridge_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log($crate::bridge::log::LogSeverity::Debug, $source, format!($($arg)*))
    };
}

/// Log an INFO message
#[macro_export]
macro_rules! bridge_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log($crate::bridge::log::LogSeverity::Info, $source, format!($($arg)*))
    };
}

/// Log a WARN message
#[macro_export]
macro_rules! bridge_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log($crate::bridge::log::LogSeverity::Warn, $source, format!($($arg)*))
    };
}

/// Log an ERROR message with its call site
#[macro_export]
macro_rules! bridge_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log_detailed(
            $crate::bridge::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!(),
        )
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
