//! Error types for fieldkit-core

use thiserror::Error;

/// Result type alias using fieldkit-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fieldkit-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The local storage engine cannot be opened or written. Blocks offline
    /// mode entirely; surfaced by the preflight check.
    #[error("Local storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;

        if let rusqlite::Error::SqliteFailure(failure, _) = &error {
            match failure.code {
                ErrorCode::CannotOpen
                | ErrorCode::DiskFull
                | ErrorCode::ReadOnly
                | ErrorCode::NotADatabase
                | ErrorCode::PermissionDenied => {
                    return Self::StorageUnavailable(error.to_string());
                }
                _ => {}
            }
        }

        Self::Database(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_errors_map_to_database() {
        let error = Error::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(error, Error::Database(_)));
    }

    #[test]
    fn open_failures_map_to_storage_unavailable() {
        let failure = rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN);
        let error = Error::from(rusqlite::Error::SqliteFailure(failure, None));
        assert!(matches!(error, Error::StorageUnavailable(_)));
    }
}
