//! The `Reservation` record a participant hands back once a unit is held
//! (spec §4.3).

use serde::{Deserialize, Serialize};

use booking_core::ReservationId;

use crate::date_range::DateRange;
use crate::resource::ResourceKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Held during a saga's forward path, or a 2PC prepare vote.
    Pending,
    /// Forward path completed / 2PC commit landed.
    Confirmed,
    /// Compensated by a saga cancel, or rolled back by a 2PC abort.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub order_id: String,
    pub kind: ResourceKind,
    pub unit_id: String,
    /// `None` for train seats, which carry no date range.
    pub range: Option<DateRange>,
    pub status: ReservationStatus,
}

impl Reservation {
    pub fn new_pending(
        order_id: impl Into<String>,
        kind: ResourceKind,
        unit_id: impl Into<String>,
        range: Option<DateRange>,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            order_id: order_id.into(),
            kind,
            unit_id: unit_id.into(),
            range,
            status: ReservationStatus::Pending,
        }
    }

    pub fn confirm(&mut self) {
        self.status = ReservationStatus::Confirmed;
    }

    pub fn cancel(&mut self) {
        self.status = ReservationStatus::Cancelled;
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }
}
