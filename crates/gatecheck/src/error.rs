//! Error types for gatecheck.
//!
//! This module defines all error types used throughout the gatecheck crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for gatecheck operations.
#[derive(Error, Debug)]
pub enum Error {
    // === History Storage Errors ===
    /// Failed to open or create the scan history database.
    #[error("failed to open history database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Roster Errors ===
    /// No API token was found for the remote sheet.
    #[error("missing sheet credentials: set the {env_var} environment variable")]
    CredentialsMissing {
        /// Name of the environment variable that should hold the token.
        env_var: String,
    },

    /// The remote sheet rejected the supplied credentials.
    #[error("sheet credentials rejected (HTTP {status})")]
    CredentialsRejected {
        /// The HTTP status returned by the sheet API.
        status: u16,
    },

    /// The spreadsheet or worksheet could not be found.
    #[error("worksheet '{worksheet}' not found in spreadsheet '{spreadsheet_id}'")]
    WorksheetNotFound {
        /// The spreadsheet identifier.
        spreadsheet_id: String,
        /// The worksheet name.
        worksheet: String,
    },

    /// The sheet header row is missing a required column.
    #[error("sheet is missing required column '{column}'")]
    ColumnMissing {
        /// Name of the missing column.
        column: String,
    },

    /// The sheet API returned a non-success status.
    #[error("sheet request failed with HTTP {status}: {message}")]
    SheetRequest {
        /// The HTTP status code.
        status: u16,
        /// Response detail, if any.
        message: String,
    },

    /// The sheet API could not be reached.
    #[error("sheet transport error: {0}")]
    SheetTransport(String),

    // === Scan Errors ===
    /// The image file could not be opened or decoded as an image.
    #[error("failed to load image {path}: {message}")]
    ImageLoad {
        /// Path to the offending image.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// No QR code could be decoded from the image.
    #[error("no decodable QR code found in {path}")]
    NoCodeFound {
        /// Path to the scanned image.
        path: PathBuf,
    },

    /// The decoded payload does not contain a usable identifier line.
    #[error("malformed payload: {reason}")]
    PayloadFormat {
        /// Why the payload was rejected.
        reason: String,
    },

    // === Frame Source Errors ===
    /// A frame source failed to start.
    #[error("failed to start frame source '{name}': {message}")]
    SourceStart {
        /// Name of the frame source.
        name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for gatecheck operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new payload format error.
    #[must_use]
    pub fn payload_format(reason: impl Into<String>) -> Self {
        Self::PayloadFormat {
            reason: reason.into(),
        }
    }

    /// Create a new sheet transport error.
    #[must_use]
    pub fn sheet_transport(message: impl Into<String>) -> Self {
        Self::SheetTransport(message.into())
    }

    /// Create a frame source start error.
    #[must_use]
    pub fn source_start(name: &'static str, message: impl Into<String>) -> Self {
        Self::SourceStart {
            name,
            message: message.into(),
        }
    }

    /// Check if this error means the scanned image held no decodable code.
    #[must_use]
    pub fn is_no_code_found(&self) -> bool {
        matches!(self, Self::NoCodeFound { .. })
    }

    /// Check if this error is a credentials problem.
    #[must_use]
    pub fn is_credentials_error(&self) -> bool {
        matches!(
            self,
            Self::CredentialsMissing { .. } | Self::CredentialsRejected { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");

        let err = Error::payload_format("no ID line");
        assert_eq!(err.to_string(), "malformed payload: no ID line");
    }

    #[test]
    fn test_credentials_missing_display() {
        let err = Error::CredentialsMissing {
            env_var: "GATECHECK_SHEET_TOKEN".to_string(),
        };
        assert!(err.to_string().contains("GATECHECK_SHEET_TOKEN"));
        assert!(err.is_credentials_error());
    }

    #[test]
    fn test_credentials_rejected_is_credentials_error() {
        let err = Error::CredentialsRejected { status: 403 };
        assert!(err.is_credentials_error());
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn test_worksheet_not_found_display() {
        let err = Error::WorksheetNotFound {
            spreadsheet_id: "abc123".to_string(),
            worksheet: "Guests".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("Guests"));
    }

    #[test]
    fn test_column_missing_display() {
        let err = Error::ColumnMissing {
            column: "Verified".to_string(),
        };
        assert!(err.to_string().contains("Verified"));
    }

    #[test]
    fn test_sheet_request_display() {
        let err = Error::SheetRequest {
            status: 500,
            message: "backend unavailable".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("backend unavailable"));
    }

    #[test]
    fn test_no_code_found_predicate() {
        let err = Error::NoCodeFound {
            path: PathBuf::from("/tmp/frame.png"),
        };
        assert!(err.is_no_code_found());
        assert!(!err.is_credentials_error());
        assert!(err.to_string().contains("/tmp/frame.png"));
    }

    #[test]
    fn test_image_load_display() {
        let err = Error::ImageLoad {
            path: PathBuf::from("/tmp/bad.png"),
            message: "not a PNG".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/bad.png"));
        assert!(msg.contains("not a PNG"));
    }

    #[test]
    fn test_source_start_error() {
        let err = Error::source_start("directory-watch", "spool dir missing");
        let msg = err.to_string();
        assert!(msg.contains("directory-watch"));
        assert!(msg.contains("spool dir missing"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "invalid poll interval".to_string(),
        };
        assert!(err.to_string().contains("invalid poll interval"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
