//! Shared identifiers and error model used by every booking crate.

mod error;
mod id;

pub use error::{BookingError, BookingResult};
pub use id::{OrderId, ReservationId, TransactionId};

/// Marker trait for value objects: equality by value, not identity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
