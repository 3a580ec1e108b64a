//! Error types for index translation
//!
//! This module defines the error kinds a draw call's index preparation can
//! fail with, plus the `bridge_err!` / `bridge_bail!` helpers that log an
//! error before handing it back to the caller.

use std::fmt;

/// Result type for index translation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Index translation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Element count too large for the destination width, or backend allocation failed
    OutOfMemory(String),

    /// Backing buffer refused to supply its current contents
    ReadBackFailure(String),

    /// Backend failed to provide a writable region
    MappingFailure(String),

    /// Conversion requested between an unsupported pair of index widths
    Unsupported(String),

    /// Other backend failure (unmap, discard, ...)
    BackendError(String),

    /// Request does not fit its source data
    InvalidResource(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfMemory(msg) => write!(f, "Out of memory: {}", msg),
            Error::ReadBackFailure(msg) => write!(f, "Read-back failure: {}", msg),
            Error::MappingFailure(msg) => write!(f, "Mapping failure: {}", msg),
            Error::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR message and build the matching `Error` variant
///
/// # Example
///
/// ```ignore
/// let err = bridge_err!("index_bridge::streaming", OutOfMemory,
///     "Reserving {} indices exceeds the maximum buffer size", count);
/// ```
#[macro_export]
macro_rules! bridge_err {
    ($source:expr, $kind:ident, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::log::log_detailed(
            $crate::bridge::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::bridge::Error::$kind(message)
    }};
}

/// Log an ERROR message and return `Err` with the matching `Error` variant
///
/// # Example
///
/// ```ignore
/// bridge_bail!("index_bridge::converter", Unsupported,
///     "Cannot convert {:?} indices to {:?}", source, destination);
/// ```
#[macro_export]
macro_rules! bridge_bail {
    ($source:expr, $kind:ident, $($arg:tt)*) => {
        return Err($crate::bridge_err!($source, $kind, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
