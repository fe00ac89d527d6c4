//! Strongly-typed identifiers used across the booking domain.
//!
//! All ids are UUIDv7, which embeds a millisecond timestamp prefix: rows
//! created later sort after rows created earlier for all practical query and
//! debugging purposes, without requiring a separate sequence.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BookingError;

macro_rules! impl_uuid_newtype {
    ($t:ident, $name:literal) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = BookingError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| BookingError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

/// Identifier of a client order (saga subsystem and 2PC `ClientOrder`).
impl_uuid_newtype!(OrderId, "OrderId");

/// Identifier of a 2PC transaction, distinct from the order id it drives.
impl_uuid_newtype!(TransactionId, "TransactionId");

/// Identifier of a reservation held in a single domain (hotel/car/train).
impl_uuid_newtype!(ReservationId, "ReservationId");
