//! Reserve/cancel command handling for one resource domain (spec §4.2).

use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;

use booking_core::BookingError;
use booking_domain::saga::message::EventName;
use booking_domain::saga::SagaMessage;
use booking_domain::{DateRange, ResourceKind};
use booking_messaging::EventBus;
use booking_store::saga::availability;

/// Parse the reserve-command payload for `kind` into `(unit_id, date_range)`
/// (spec §6.2 payload shapes per domain).
fn parse_reserve_payload(kind: ResourceKind, message: &SagaMessage) -> Result<(String, Option<DateRange>), BookingError> {
    let unit_field = match kind {
        ResourceKind::Hotel => "hotel_room_id",
        ResourceKind::Car => "car_id",
        ResourceKind::Train => "seat_id",
    };
    let unit_id = message
        .payload
        .get(unit_field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| BookingError::validation(format!("reserve command missing {unit_field}")))?
        .to_string();

    if !kind.has_date_range() {
        return Ok((unit_id, None));
    }

    let start = message
        .payload
        .get("start_date")
        .and_then(|v| v.as_str())
        .ok_or_else(|| BookingError::validation("reserve command missing start_date"))?;
    let end = message
        .payload
        .get("end_date")
        .and_then(|v| v.as_str())
        .ok_or_else(|| BookingError::validation("reserve command missing end_date"))?;
    let range = DateRange::new(
        booking_domain::date_range::parse_iso(start)?,
        booking_domain::date_range::parse_iso(end)?,
    )?;
    Ok((unit_id, Some(range)))
}

/// Handle one reserve-command: reserve, then publish `reserved` or `failed`
/// fire-and-forget (spec §4.2 "publication is fire-and-forget").
pub async fn handle_reserve(pool: &PgPool, bus: &Arc<dyn EventBus>, kind: ResourceKind, message: SagaMessage) {
    let order_id = message.correlation_id.clone();

    let outcome = match parse_reserve_payload(kind, &message) {
        Ok((unit_id, range)) => availability::reserve(pool, &order_id, kind, &unit_id, range).await,
        Err(err) => Err(err),
    };

    let reply = match outcome {
        Ok(reservation_id) => SagaMessage::new(
            EventName::Reserved(kind),
            order_id.clone(),
            json!({ format!("{}_reservation_id", booking_domain::saga::wire_segment(kind)): reservation_id.to_string() }),
        ),
        Err(err) => {
            tracing::warn!(%err, %kind, %order_id, "reserve command failed");
            SagaMessage::new(EventName::ReservationFailed(kind), order_id.clone(), json!({ "failure_reason": err.to_string() }))
        }
    };

    if let Err(err) = bus.publish(reply).await {
        tracing::warn!(%err, %kind, %order_id, "failed to publish reserve reply (accepted loss, spec 4.2)");
    }
}

/// Handle one cancel-command: idempotent no-op if nothing is held, no reply
/// published (spec §4.2 "Cancel handler").
pub async fn handle_cancel(pool: &PgPool, kind: ResourceKind, message: SagaMessage) {
    let order_id = message.correlation_id.clone();
    if let Err(err) = availability::cancel(pool, &order_id, kind).await {
        tracing::error!(%err, %kind, %order_id, "cancel command failed");
    }
}

/// Subscribe to this domain's reserve/cancel routing keys and dispatch each
/// message, until `shutdown` fires (spec §6.2: "a participant subscribes to
/// a queue bound to the reserve/cancel routing keys relevant to its
/// domain").
pub async fn run(pool: PgPool, bus: Arc<dyn EventBus>, kind: ResourceKind, shutdown: tokio_util::sync::CancellationToken) {
    let routing_keys = vec![
        EventName::ReserveCommand(kind).as_routing_key(),
        EventName::CancelCommand(kind).as_routing_key(),
    ];

    let mut subscription = match bus.subscribe(&routing_keys).await {
        Ok(sub) => sub,
        Err(err) => {
            tracing::error!(%err, %kind, "failed to subscribe to saga commands");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(%kind, "saga participant shutting down");
                return;
            }
            message = subscription.recv() => {
                match message {
                    Ok(Some(message)) => match message.parsed_event_name() {
                        Some(EventName::ReserveCommand(k)) if k == kind => handle_reserve(&pool, &bus, kind, message).await,
                        Some(EventName::CancelCommand(k)) if k == kind => handle_cancel(&pool, kind, message).await,
                        _ => tracing::warn!(%kind, event_name = %message.event_name, "received message outside this domain's bindings"),
                    },
                    Ok(None) => {
                        tracing::warn!(%kind, "saga command subscription closed");
                        return;
                    }
                    Err(err) => tracing::error!(%err, %kind, "error receiving saga command"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserve_message(kind: ResourceKind, payload: serde_json::Value) -> SagaMessage {
        SagaMessage::new(EventName::ReserveCommand(kind), "order-1", payload)
    }

    #[test]
    fn parses_hotel_payload_with_date_range() {
        let message = reserve_message(
            ResourceKind::Hotel,
            json!({ "hotel_room_id": "room-7", "start_date": "2026-01-10", "end_date": "2026-01-12" }),
        );
        let (unit_id, range) = parse_reserve_payload(ResourceKind::Hotel, &message).unwrap();
        assert_eq!(unit_id, "room-7");
        assert!(range.is_some());
    }

    #[test]
    fn parses_train_payload_without_date_range() {
        let message = reserve_message(ResourceKind::Train, json!({ "seat_id": "seat-3" }));
        let (unit_id, range) = parse_reserve_payload(ResourceKind::Train, &message).unwrap();
        assert_eq!(unit_id, "seat-3");
        assert!(range.is_none());
    }

    #[test]
    fn missing_unit_field_is_a_validation_error() {
        let message = reserve_message(ResourceKind::Car, json!({ "start_date": "2026-01-10", "end_date": "2026-01-12" }));
        let err = parse_reserve_payload(ResourceKind::Car, &message).unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[test]
    fn missing_date_field_is_a_validation_error() {
        let message = reserve_message(ResourceKind::Car, json!({ "car_id": "car-1", "start_date": "2026-01-10" }));
        let err = parse_reserve_payload(ResourceKind::Car, &message).unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }
}
