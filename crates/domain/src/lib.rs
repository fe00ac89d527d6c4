//! Shared booking domain: resource selections, date ranges, availability,
//! reservations, and the two aggregate state machines (saga `Order`, 2PC
//! `TransactionLog`).
//!
//! This crate has no IO. Persistence lives in `booking-store`, transport in
//! `booking-messaging`; the crates that wire those together (the
//! orchestrator, the coordinator, and the four participant binaries) depend
//! on this one for the types and pure transition functions.

pub mod availability;
pub mod date_range;
pub mod request;
pub mod reservation;
pub mod resource;

pub mod saga;
pub mod twopc;

pub use availability::AvailabilityRecord;
pub use date_range::DateRange;
pub use request::BookingRequest;
pub use reservation::{Reservation, ReservationStatus};
pub use resource::ResourceKind;
