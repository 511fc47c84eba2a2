//! Error types for trueno-inspect.
//!
//! The engine itself is total: malformed dumps, bad frame deltas and missing
//! sensors all degrade to visibly-wrong output instead of errors. The only
//! fallible edge is loading configuration.

use std::io;
use thiserror::Error;

/// Result type alias using [`InspectorError`].
pub type Result<T> = std::result::Result<T, InspectorError>;

/// Errors that can occur while configuring the inspector.
#[derive(Debug, Error)]
pub enum InspectorError {
    /// Configuration file not found or unreadable.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed, 0 if unknown).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with invalid value.
        key: String,
        /// Error message describing why the value is invalid.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_error_includes_line_number() {
        let err = InspectorError::ConfigParse { line: 42, message: "invalid value".to_string() };
        let display = err.to_string();

        assert!(display.contains("42"), "Error should include line number: {}", display);
        assert!(display.contains("invalid value"), "Error should include message: {}", display);
    }

    #[test]
    fn test_config_invalid_includes_key() {
        let err = InspectorError::ConfigInvalid {
            key: "explorer.line_height".to_string(),
            message: "must be positive".to_string(),
        };
        assert!(err.to_string().contains("explorer.line_height"));
    }

    #[test]
    fn test_config_not_found_includes_path() {
        let err = InspectorError::ConfigNotFound("/etc/inspect.yaml".to_string());
        assert!(err.to_string().contains("/etc/inspect.yaml"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: InspectorError = io_err.into();

        assert!(matches!(err, InspectorError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InspectorError>();
    }
}
