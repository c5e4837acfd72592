//! Error types for the kubelite object store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// Nothing is retried internally; every variant names the file or operation
/// that failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The name cannot be mapped onto a file in the store directory.
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to decode {file}: {source}")]
    Encoding {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Build a closure mapping an `io::Error` into `StoreError::Io` with a formatted context.
macro_rules! io_err {
    ($($arg:tt)*) => {
        |source| $crate::error::StoreError::Io {
            context: format!($($arg)*),
            source,
        }
    };
}

pub(crate) use io_err;
