//! Error types for Cabinet.

use thiserror::Error;

use crate::file::NameError;

/// Common error type for Cabinet.
#[derive(Error, Debug)]
pub enum CabinetError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error, usually from the blob store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry is missing, or exists but is not visible to the caller.
    ///
    /// The two cases are deliberately not distinguished.
    #[error("{0} not found")]
    NotFound(String),

    /// The access gate rejected the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A file or folder name failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] NameError),

    /// Input rejected for a reason other than naming.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A batch operation was aborted and rolled back.
    #[error("transaction failed: {0}")]
    TransactionFailure(String),

    /// The RBAC collaborator timed out or returned an error.
    #[error("remote permission service unavailable: {0}")]
    RemoteUnavailable(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CabinetError {
    /// Stable code for the naming rule that failed, if this is a naming error.
    pub fn validation_code(&self) -> Option<&'static str> {
        match self {
            CabinetError::Validation(e) => Some(e.code()),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for CabinetError {
    fn from(e: sqlx::Error) -> Self {
        CabinetError::Database(e.to_string())
    }
}

/// Result type alias for Cabinet operations.
pub type Result<T> = std::result::Result<T, CabinetError>;
