//! Dispatcher error types.

use thiserror::Error;

/// Errors that can occur while submitting or applying operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("operation queue is full ({0} pending)")]
    QueueFull(usize),

    #[error("dispatcher is shut down")]
    Closed,

    #[error("state store error: {0}")]
    Store(#[from] kubelite_store::StoreError),

    #[error("operation handler failed: {0}")]
    Handler(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
