//! Error kinds shared by the saga and 2PC subsystems (spec §7).

use thiserror::Error;

/// Result type used across booking crates.
pub type BookingResult<T> = Result<T, BookingError>;

/// Error kinds common to both coordination protocols.
///
/// Kept deliberately small and serializable-by-message (not by variant) so
/// it can be carried as free text in a saga failure reason or a 2PC
/// `failure_reason` column without a bespoke wire format.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Client input was malformed (bad date format, missing field).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested resource/date is already held by another reservation.
    #[error("not available: {0}")]
    NotAvailable(String),

    /// A lookup (order, transaction, reservation) missed.
    #[error("not found")]
    NotFound,

    /// An identifier was invalid (parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Optimistic concurrency lost a version race.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The bus, HTTP call, or store failed to complete.
    #[error("transport error: {0}")]
    Transport(String),

    /// A deadline was exceeded (2PC transaction timeout).
    #[error("timeout")]
    Timeout,

    /// A bug, or a failure mode that should not be reachable.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_available(msg: impl Into<String>) -> Self {
        Self::NotAvailable(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => BookingError::NotFound,
            other => BookingError::transport(other.to_string()),
        }
    }
}
