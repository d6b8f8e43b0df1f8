//! Error types for the wincmd-core library.

use thiserror::Error;

/// Result type alias for wincmd operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, invoking and parsing commands.
///
/// Every error is terminal to the operation that raised it; nothing is
/// retried internally.
#[derive(Error, Debug)]
pub enum Error {
    /// The external command could not run, timed out, or exited with a
    /// nonzero status.
    #[error("Command `{command}` failed: {reason}")]
    Invocation { command: String, reason: String },

    /// Captured output did not match the expected layout.
    #[error("Failed to parse output: {reason} (line: {line:?})")]
    Parse { reason: String, line: String },

    /// Every port in the requested range is in use.
    #[error("No free port in range {low}..={high}")]
    NoFreePort { low: u16, high: u16 },

    /// A command builder was given an invalid option combination.
    #[error("Invalid command parameter: {0}")]
    InvalidParameter(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a parse error carrying the offending line.
    pub(crate) fn parse(reason: impl Into<String>, line: impl Into<String>) -> Self {
        Error::Parse {
            reason: reason.into(),
            line: line.into(),
        }
    }

    /// Build an invalid-parameter error.
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidParameter(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoFreePort { low: 5000, high: 5002 };
        assert_eq!(err.to_string(), "No free port in range 5000..=5002");

        let err = Error::parse("missing header", "Proto  Foreign Address");
        assert!(err.to_string().contains("missing header"));
        assert!(err.to_string().contains("Proto  Foreign Address"));

        let err = Error::Invocation {
            command: "netstat -a".to_string(),
            reason: "exit code 1".to_string(),
        };
        assert!(err.to_string().contains("netstat -a"));
    }
}
