//! Error types and result handling for ferroscan.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ferroscan operations.
#[derive(Error, Debug)]
pub enum Error {
    // ===== I/O Errors =====
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to access directory: {path}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Permission denied: {path}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===== Configuration Errors =====
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Failed to save configuration: {0}")]
    ConfigSave(String),

    #[error("Invalid configuration value: {field} - {message}")]
    ConfigInvalid { field: String, message: String },

    // ===== Argument Errors =====
    #[error("Invalid argument: {0}")]
    Argument(String),

    // ===== Signature / Validation Errors =====
    #[error("Invalid signature document: {0}")]
    Validation(String),

    #[error("Store is corrupt: {path} - {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    // ===== Storage Errors =====
    #[error("Database error: {0}")]
    DatabaseSql(#[from] rusqlite::Error),

    #[error("Database operation failed: {0}")]
    Database(String),

    // ===== Scanning Errors =====
    #[error("Scan was cancelled")]
    ScanCancelled,

    #[error("Failed to scan file: {path} - {reason}")]
    ScanError { path: PathBuf, reason: String },

    // ===== Serialization Errors =====
    #[error("JSON serialization error")]
    JsonSerialize(#[from] serde_json::Error),

    // ===== Generic Errors =====
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
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

    /// Create a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a store corruption error.
    pub fn store_corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StoreCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a scan error.
    pub fn scan_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ScanError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is recoverable inside a directory walk.
    ///
    /// A recoverable error degrades one file's result to `error` status;
    /// everything else aborts the whole operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FileRead { .. } | Error::PermissionDenied { .. } | Error::ScanError { .. }
        )
    }

    /// Check if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::ScanCancelled)
    }

    /// Short machine-readable code for the JSON error object.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Argument(_) => "invalid_argument",
            Error::Validation(_) => "validation_error",
            Error::StoreCorrupt { .. } => "store_corrupt",
            Error::PathNotFound(_) => "not_found",
            Error::PermissionDenied { .. } => "permission_error",
            Error::FileRead { .. }
            | Error::FileWrite { .. }
            | Error::DirectoryAccess { .. }
            | Error::Io(_) => "io_error",
            Error::DatabaseSql(_) | Error::Database(_) => "database_error",
            Error::ConfigLoad(_) | Error::ConfigSave(_) | Error::ConfigInvalid { .. } => {
                "config_error"
            }
            Error::ScanCancelled => "cancelled",
            Error::ScanError { .. } => "scan_error",
            Error::JsonSerialize(_) => "serialize_error",
            Error::Internal(_) | Error::Other(_) => "unexpected",
        }
    }

    /// Process exit code for this error.
    ///
    /// 2 = bad input (arguments, validation), 3 = access failures, 1 = rest.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Argument(_) | Error::Validation(_) | Error::PathNotFound(_) => 2,
            Error::FileRead { .. }
            | Error::FileWrite { .. }
            | Error::DirectoryAccess { .. }
            | Error::PermissionDenied { .. }
            | Error::Io(_) => 3,
            _ => 1,
        }
    }

    /// Get the error category for logging.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::FileRead { .. }
            | Error::FileWrite { .. }
            | Error::DirectoryAccess { .. }
            | Error::PathNotFound(_)
            | Error::PermissionDenied { .. }
            | Error::Io(_) => ErrorCategory::Io,

            Error::ConfigLoad(_) | Error::ConfigSave(_) | Error::ConfigInvalid { .. } => {
                ErrorCategory::Configuration
            }

            Error::Argument(_) => ErrorCategory::Argument,

            Error::Validation(_) | Error::StoreCorrupt { .. } => ErrorCategory::Signatures,

            Error::DatabaseSql(_) | Error::Database(_) => ErrorCategory::Storage,

            Error::ScanCancelled | Error::ScanError { .. } => ErrorCategory::Scanning,

            Error::JsonSerialize(_) => ErrorCategory::Serialization,

            Error::Internal(_) | Error::Other(_) => ErrorCategory::Other,
        }
    }
}

/// Error category for classification in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Argument,
    Signatures,
    Storage,
    Scanning,
    Serialization,
    Other,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => write!(f, "I/O"),
            Self::Configuration => write!(f, "Configuration"),
            Self::Argument => write!(f, "Argument"),
            Self::Signatures => write!(f, "Signatures"),
            Self::Storage => write!(f, "Storage"),
            Self::Scanning => write!(f, "Scanning"),
            Self::Serialization => write!(f, "Serialization"),
            Self::Other => write!(f, "Other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PathNotFound(PathBuf::from("/test/path"));
        assert_eq!(err.to_string(), "Path not found: /test/path");
    }

    #[test]
    fn test_recoverable_errors() {
        let err = Error::scan_error("/test", "test reason");
        assert!(err.is_recoverable());

        let err = Error::ScanCancelled;
        assert!(!err.is_recoverable());

        let err = Error::Validation("missing keys".into());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::Argument("bad".into()).exit_code(), 2);
        assert_eq!(Error::Validation("bad".into()).exit_code(), 2);
        assert_eq!(
            Error::file_read("/x", std::io::Error::from(std::io::ErrorKind::NotFound)).exit_code(),
            3
        );
        assert_eq!(Error::ScanCancelled.exit_code(), 1);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Validation("bad".into()).code(), "validation_error");
        assert_eq!(
            Error::store_corrupt("/data/signatures.json", "not an object").code(),
            "store_corrupt"
        );
    }
}
