//! The saga's closed message vocabulary (spec §3.5, §6.2).
//!
//! `SagaMessage` is the envelope carried on the bus: `{event_name,
//! correlation_id, payload}`. `correlation_id` is always the order id.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::resource::ResourceKind;

/// One of the three resource-specific routing-key segments (`room`, `car`,
/// `seat`), distinct from `ResourceKind::as_str` because the wire vocabulary
/// uses `room`/`seat` where the domain enum uses `hotel`/`train`. Also used
/// to name the `<domain>_reservation_id` payload field on `*-reserved`
/// events (spec §6.2), for the same reason.
pub fn wire_segment(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Hotel => "room",
        ResourceKind::Car => "car",
        ResourceKind::Train => "seat",
    }
}

fn kind_from_wire_segment(segment: &str) -> Option<ResourceKind> {
    match segment {
        "room" => Some(ResourceKind::Hotel),
        "car" => Some(ResourceKind::Car),
        "seat" => Some(ResourceKind::Train),
        _ => None,
    }
}

/// A routing key from the closed vocabulary in spec §6.2.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventName {
    ReserveCommand(ResourceKind),
    CancelCommand(ResourceKind),
    Reserved(ResourceKind),
    ReservationFailed(ResourceKind),
    OrderBooked,
    OrderFailed,
}

impl EventName {
    pub fn as_routing_key(&self) -> String {
        match self {
            EventName::ReserveCommand(k) => format!("booking.command.reserve.{}", wire_segment(*k)),
            EventName::CancelCommand(k) => format!("booking.command.cancel.{}", wire_segment(*k)),
            EventName::Reserved(k) => format!("booking.event.{}.reserved", wire_segment(*k)),
            EventName::ReservationFailed(k) => format!("booking.event.{}.failed", wire_segment(*k)),
            EventName::OrderBooked => "booking.event.order.booked".to_string(),
            EventName::OrderFailed => "booking.event.order.failed".to_string(),
        }
    }

    pub fn parse(routing_key: &str) -> Option<Self> {
        if routing_key == "booking.event.order.booked" {
            return Some(EventName::OrderBooked);
        }
        if routing_key == "booking.event.order.failed" {
            return Some(EventName::OrderFailed);
        }
        let mut parts = routing_key.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("booking"), Some("command"), Some("reserve"), Some(seg)) => {
                kind_from_wire_segment(seg).map(EventName::ReserveCommand)
            }
            (Some("booking"), Some("command"), Some("cancel"), Some(seg)) => {
                kind_from_wire_segment(seg).map(EventName::CancelCommand)
            }
            (Some("booking"), Some("event"), Some(seg), Some("reserved")) => {
                kind_from_wire_segment(seg).map(EventName::Reserved)
            }
            (Some("booking"), Some("event"), Some(seg), Some("failed")) => {
                kind_from_wire_segment(seg).map(EventName::ReservationFailed)
            }
            _ => None,
        }
    }

    /// `true` for the six routing keys the orchestrator subscribes to
    /// (spec §6.2: "the orchestrator subscribes to queues bound to the six
    /// reply routing keys").
    pub fn is_reply(&self) -> bool {
        matches!(self, EventName::Reserved(_) | EventName::ReservationFailed(_))
    }
}

/// The envelope carried on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaMessage {
    pub event_name: String,
    pub correlation_id: String,
    pub payload: JsonValue,
}

impl SagaMessage {
    pub fn new(event_name: EventName, correlation_id: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            event_name: event_name.as_routing_key(),
            correlation_id: correlation_id.into(),
            payload,
        }
    }

    pub fn parsed_event_name(&self) -> Option<EventName> {
        EventName::parse(&self.event_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_keys_match_the_closed_vocabulary() {
        assert_eq!(
            EventName::ReserveCommand(ResourceKind::Hotel).as_routing_key(),
            "booking.command.reserve.room"
        );
        assert_eq!(
            EventName::CancelCommand(ResourceKind::Train).as_routing_key(),
            "booking.command.cancel.seat"
        );
        assert_eq!(
            EventName::Reserved(ResourceKind::Car).as_routing_key(),
            "booking.event.car.reserved"
        );
        assert_eq!(
            EventName::ReservationFailed(ResourceKind::Hotel).as_routing_key(),
            "booking.event.room.failed"
        );
        assert_eq!(EventName::OrderBooked.as_routing_key(), "booking.event.order.booked");
    }

    #[test]
    fn routing_keys_round_trip_through_parse() {
        for event in [
            EventName::ReserveCommand(ResourceKind::Hotel),
            EventName::CancelCommand(ResourceKind::Car),
            EventName::Reserved(ResourceKind::Train),
            EventName::ReservationFailed(ResourceKind::Car),
            EventName::OrderBooked,
            EventName::OrderFailed,
        ] {
            let key = event.as_routing_key();
            assert_eq!(EventName::parse(&key), Some(event));
        }
    }

    #[test]
    fn reply_events_are_exactly_the_six_reserved_and_failed_keys() {
        assert!(EventName::Reserved(ResourceKind::Hotel).is_reply());
        assert!(EventName::ReservationFailed(ResourceKind::Car).is_reply());
        assert!(!EventName::ReserveCommand(ResourceKind::Hotel).is_reply());
        assert!(!EventName::OrderBooked.is_reply());
    }

    #[test]
    fn unknown_routing_key_fails_to_parse() {
        assert_eq!(EventName::parse("booking.event.plane.reserved"), None);
        assert_eq!(EventName::parse("not.a.booking.key"), None);
    }
}
