//! Error types for rfdocs.
//!
//! Library crates use [`RfDocsError`] via `thiserror`.
//! The CLI wraps process-level failures with `color-eyre`; everything a
//! caller can act on is turned into a structured payload at the boundary.

use std::path::PathBuf;

/// Failure of a single document fetch.
///
/// The three kinds are kept apart because callers report them with
/// distinct messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP Error {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    /// DNS, connect, timeout or other transport-level failure.
    #[error("URL Error: {0}")]
    Transport(String),

    /// Anything else (body decoding, writing the cache slot, ...).
    #[error("{0}")]
    Other(String),
}

/// Failure while pulling structured data out of a fetched document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The anchor pattern does not occur in the document.
    #[error("could not find `{anchor}` in document")]
    AnchorNotFound { anchor: String },

    /// Input ended before the braces balanced.
    #[error("could not find end of embedded JSON literal (opened at byte {start})")]
    UnterminatedLiteral { start: usize },

    /// The balanced span is not valid JSON.
    #[error("JSON parsing error: {0}")]
    Decode(String),
}

/// Top-level error type for all rfdocs operations.
#[derive(Debug, thiserror::Error)]
pub enum RfDocsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// HTTP client construction failure.
    #[error("network error: {0}")]
    Network(String),

    /// A document could not be fetched.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A document could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A persisted index is absent, unreadable or from another version.
    #[error("{index} index not found at {path:?}: {reason}")]
    IndexMissing {
        index: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// The requested library is not configured or not indexed.
    #[error("Library '{library}' not found")]
    LibraryNotFound {
        library: String,
        available: Vec<String>,
    },

    /// A keyword filter is not a valid regular expression.
    #[error("Invalid regex pattern: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (serialization, malformed artifact, ...).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RfDocsError>;

impl RfDocsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// An index artifact that has to be (re)built before it can be queried.
    pub fn index_missing(
        index: &'static str,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::IndexMissing {
            index,
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether a rebuild could make this error go away.
    pub fn is_index_missing(&self) -> bool {
        matches!(self, Self::IndexMissing { .. })
    }
}
