//! The saga `Order` aggregate and its state machine (spec §3.1, §4.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use booking_core::{BookingError, OrderId, ReservationId};

use crate::request::BookingRequest;
use crate::resource::ResourceKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    AwaitingConfirmation,
    Booked,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Booked | OrderStatus::Failed)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Pending,
    Booked,
    Failed,
}

impl ParticipantStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ParticipantStatus::Booked | ParticipantStatus::Failed)
    }
}

/// Per-domain leg of the order: its current status, reservation id once
/// booked, and failure reason once failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantLeg {
    pub status: ParticipantStatus,
    pub reservation_id: Option<ReservationId>,
    pub failure_reason: Option<String>,
}

impl ParticipantLeg {
    fn pending() -> Self {
        Self {
            status: ParticipantStatus::Pending,
            reservation_id: None,
            failure_reason: None,
        }
    }
}

/// The order aggregate that the orchestrator persists and drives to a
/// terminal state (spec §3.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: String,
    pub status: OrderStatus,
    /// The resource selections this order was placed with (spec §3.1
    /// "resource selections"): the hotel room + dates, car + dates, and
    /// train seat the orchestrator asked participants to hold.
    pub request: BookingRequest,
    pub legs: HashMap<ResourceKind, ParticipantLeg>,
    /// Set once, when entering `failed`, so compensation is published exactly
    /// once even under at-least-once redelivery of the event that triggered it.
    pub compensation_published: bool,
    /// Set once, when entering a terminal state, so the final event
    /// (`order.booked` / `order.failed`) is published exactly once.
    pub final_event_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(user_id: impl Into<String>, request: BookingRequest, now: DateTime<Utc>) -> Self {
        let mut legs = HashMap::new();
        for kind in ResourceKind::all() {
            legs.insert(kind, ParticipantLeg::pending());
        }
        Self {
            id: OrderId::new(),
            user_id: user_id.into(),
            status: OrderStatus::Pending,
            request,
            legs,
            compensation_published: false,
            final_event_published: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition `pending -> awaiting-confirmation` after the three
    /// reserve-commands have been published (spec §4.1 `StartSaga`).
    pub fn mark_awaiting_confirmation(&mut self, now: DateTime<Utc>) -> Result<(), BookingError> {
        if self.status != OrderStatus::Pending {
            return Err(BookingError::internal(format!(
                "order {} cannot leave pending from {:?}",
                self.id, self.status
            )));
        }
        self.status = OrderStatus::AwaitingConfirmation;
        self.updated_at = now;
        Ok(())
    }

    /// Apply a reply event for one leg, then recompute the aggregate state
    /// (spec §4.1 `ProcessSagaEvent`, state-machine transitions).
    ///
    /// Idempotent: replaying the same leg outcome is a no-op once that leg is
    /// terminal (spec §9 "natural idempotency").
    pub fn apply_leg_reply(
        &mut self,
        kind: ResourceKind,
        outcome: Result<ReservationId, String>,
        now: DateTime<Utc>,
    ) {
        let leg = self
            .legs
            .get_mut(&kind)
            .expect("all three legs are seeded in Order::new");

        if leg.status.is_terminal() {
            return;
        }

        match outcome {
            Ok(reservation_id) => {
                leg.status = ParticipantStatus::Booked;
                leg.reservation_id = Some(reservation_id);
            }
            Err(reason) => {
                leg.status = ParticipantStatus::Failed;
                leg.failure_reason = Some(reason);
            }
        }
        self.updated_at = now;
        self.recompute_aggregate_status(now);
    }

    fn recompute_aggregate_status(&mut self, now: DateTime<Utc>) {
        if self.status != OrderStatus::AwaitingConfirmation {
            return;
        }
        let all_terminal = self.legs.values().all(|l| l.status.is_terminal());
        if !all_terminal {
            return;
        }
        let any_failed = self.legs.values().any(|l| l.status == ParticipantStatus::Failed);
        self.status = if any_failed {
            OrderStatus::Failed
        } else {
            OrderStatus::Booked
        };
        self.updated_at = now;
    }

    /// Whether compensation should be published: aggregate just reached
    /// `failed` and hasn't compensated yet (spec §4.1 compensation rule:
    /// cancel unconditionally, to every participant).
    pub fn needs_compensation(&self) -> bool {
        self.status == OrderStatus::Failed && !self.compensation_published
    }

    pub fn mark_compensation_published(&mut self) {
        self.compensation_published = true;
    }

    pub fn needs_final_event(&self) -> bool {
        self.status.is_terminal() && !self.final_event_published
    }

    pub fn mark_final_event_published(&mut self) {
        self.final_event_published = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_core::ReservationId;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn sample_request() -> BookingRequest {
        use crate::date_range::DateRange;
        use crate::request::ResourceSelection;
        use chrono::NaiveDate;

        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let range = DateRange::new(d, d).unwrap();
        BookingRequest {
            customer_id: "user-1".to_string(),
            selections: vec![
                ResourceSelection {
                    kind: ResourceKind::Hotel,
                    unit_id: "room-1".to_string(),
                    range: Some(range),
                },
                ResourceSelection {
                    kind: ResourceKind::Car,
                    unit_id: "car-1".to_string(),
                    range: Some(range),
                },
                ResourceSelection {
                    kind: ResourceKind::Train,
                    unit_id: "seat-1".to_string(),
                    range: None,
                },
            ],
        }
    }

    #[test]
    fn all_three_booked_reaches_booked() {
        let mut order = Order::new("user-1", sample_request(), now());
        order.mark_awaiting_confirmation(now()).unwrap();
        for kind in ResourceKind::all() {
            order.apply_leg_reply(kind, Ok(ReservationId::new()), now());
        }
        assert_eq!(order.status, OrderStatus::Booked);
        assert!(order.needs_final_event());
        assert!(!order.needs_compensation());
    }

    #[test]
    fn one_failure_among_terminal_legs_reaches_failed_and_needs_compensation() {
        let mut order = Order::new("user-1", sample_request(), now());
        order.mark_awaiting_confirmation(now()).unwrap();
        order.apply_leg_reply(ResourceKind::Hotel, Ok(ReservationId::new()), now());
        order.apply_leg_reply(ResourceKind::Car, Ok(ReservationId::new()), now());
        order.apply_leg_reply(ResourceKind::Train, Err("seat held".to_string()), now());

        assert_eq!(order.status, OrderStatus::Failed);
        assert!(order.needs_compensation());
        assert!(order.needs_final_event());
    }

    #[test]
    fn partial_replies_stay_in_awaiting_confirmation() {
        let mut order = Order::new("user-1", sample_request(), now());
        order.mark_awaiting_confirmation(now()).unwrap();
        order.apply_leg_reply(ResourceKind::Hotel, Ok(ReservationId::new()), now());
        assert_eq!(order.status, OrderStatus::AwaitingConfirmation);
    }

    #[test]
    fn replaying_the_same_leg_reply_is_a_no_op() {
        let mut order = Order::new("user-1", sample_request(), now());
        order.mark_awaiting_confirmation(now()).unwrap();
        let reservation = ReservationId::new();
        order.apply_leg_reply(ResourceKind::Hotel, Ok(reservation), now());
        // A duplicate delivery with a different reservation id must not
        // overwrite the first (monotone per-leg transition, spec §9).
        order.apply_leg_reply(ResourceKind::Hotel, Ok(ReservationId::new()), now());
        assert_eq!(order.legs[&ResourceKind::Hotel].reservation_id, Some(reservation));
    }

    #[test]
    fn compensation_and_final_event_are_each_published_at_most_once() {
        let mut order = Order::new("user-1", sample_request(), now());
        order.mark_awaiting_confirmation(now()).unwrap();
        order.apply_leg_reply(ResourceKind::Hotel, Err("x".into()), now());
        order.apply_leg_reply(ResourceKind::Car, Err("x".into()), now());
        order.apply_leg_reply(ResourceKind::Train, Err("x".into()), now());

        assert!(order.needs_compensation());
        order.mark_compensation_published();
        assert!(!order.needs_compensation());

        assert!(order.needs_final_event());
        order.mark_final_event_published();
        assert!(!order.needs_final_event());
    }
}
