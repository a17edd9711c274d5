//! Common error types for the karaoke services

use thiserror::Error;
use uuid::Uuid;

/// Common result type for karaoke operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the karaoke services
///
/// `NoEligibleSongs` is intentionally absent: an autoplay pass that finds
/// nothing is a valid outcome, not a fault.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested event, queue entry, singer or song does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or inconsistent request (bad singer list, request limit reached, ...)
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Reorder submitted an id outside the reorderable subset
    #[error("Invalid queue id in ordering: {0}")]
    InvalidId(Uuid),

    /// Reorder id set does not match the reorderable subset exactly
    #[error("Incomplete or duplicate ordering: {0}")]
    IncompleteOrDuplicateOrder(String),

    /// Operation not valid for the current state (e.g. ending a break while not on one)
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Entries changed between reading and committing a reorder; caller should retry
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Per-event lock could not be acquired in time
    #[error("Busy: {0}")]
    Busy(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for SQLite contention errors that are safe to retry
    pub fn is_database_locked(&self) -> bool {
        match self {
            Error::Database(db_err) => {
                let msg = db_err.to_string();
                msg.contains("database is locked") || msg.contains("database table is locked")
            }
            _ => false,
        }
    }
}
