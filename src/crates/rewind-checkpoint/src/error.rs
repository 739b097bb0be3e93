//! Error types for checkpoint operations

use thiserror::Error;

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur during checkpoint operations
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// No checkpoint or latest pointer exists at the requested key.
    ///
    /// Callers of rollback/restore must treat this as "no recovery
    /// available", not as a transient condition to retry.
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    /// The fast store is unreachable, erroring, or timed out.
    ///
    /// A failed checkpoint aborts the mutating operation that requested it;
    /// checkpoint-before-mutate is a hard precondition.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Binary serialization error
    #[error("Binary serialization error: {0}")]
    BinarySerialization(#[from] bincode::Error),

    /// Restore dispatch failed in the owning subsystem's handler
    #[error("Restore handler error: {0}")]
    Restore(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid argument or state
    #[error("Invalid checkpoint request: {0}")]
    Invalid(String),
}
