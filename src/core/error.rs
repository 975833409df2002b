//! Error types and result handling for opsift.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for opsift operations.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Path Errors =====
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to access directory: {path}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===== Decode Errors =====
    #[error("Failed to decode capture: {path} - {reason}")]
    Decode { path: PathBuf, reason: String },

    // ===== Scan Control Errors =====
    #[error("A search is already in progress")]
    AlreadyRunning,

    #[error("No search has been started")]
    NoSearch,

    #[error("Invalid opcode: {0}")]
    InvalidOpcode(String),

    #[error("No file extensions given")]
    NoExtensions,

    // ===== Configuration Errors =====
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Failed to save configuration: {0}")]
    ConfigSave(String),

    #[error("Invalid configuration value: {field} - {message}")]
    ConfigInvalid { field: String, message: String },

    // ===== Concurrency Errors =====
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    // ===== Serialization Errors =====
    #[error("JSON serialization error")]
    JsonSerialize(#[from] serde_json::Error),

    // ===== Generic Errors =====
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a decode error.
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a lock poisoned error.
    pub fn lock_poisoned(context: impl Into<String>) -> Self {
        Self::LockPoisoned {
            context: context.into(),
        }
    }

    /// Check if this error only affects a single file (scan can continue).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::FileRead { .. })
    }

    /// Check if this error rejects the search root.
    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            Error::PathNotFound(_) | Error::NotADirectory(_) | Error::DirectoryAccess { .. }
        )
    }

    /// Get a user-friendly suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::PathNotFound(_) | Error::NotADirectory(_) => {
                Some("Check that the search root exists and is a directory")
            }
            Error::DirectoryAccess { .. } => {
                Some("Check that you have permission to list the search root")
            }
            Error::AlreadyRunning => Some("Stop the current search or wait for it to finish"),
            Error::InvalidOpcode(_) => Some("Opcodes are hexadecimal, e.g. F7B0 or 0xF7B0"),
            Error::ConfigLoad(_) | Error::ConfigInvalid { .. } => {
                Some("Check your configuration file for syntax errors or missing fields")
            }
            Error::LockPoisoned { .. } => Some("Internal error: restart the application"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PathNotFound(PathBuf::from("/captures/missing"));
        assert_eq!(err.to_string(), "Path not found: /captures/missing");
    }

    #[test]
    fn test_recoverable_errors() {
        let err = Error::decode("/captures/a.pcap", "truncated block");
        assert!(err.is_recoverable());
        assert!(!err.is_path_error());

        let err = Error::PathNotFound(PathBuf::from("/nope"));
        assert!(!err.is_recoverable());
        assert!(err.is_path_error());

        assert!(!Error::AlreadyRunning.is_recoverable());
    }

    #[test]
    fn test_suggestions() {
        assert!(Error::AlreadyRunning.suggestion().is_some());
        assert!(Error::Internal("x".into()).suggestion().is_none());
    }
}
