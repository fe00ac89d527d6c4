//! Orchestrator core: `StartSaga` and `ProcessSagaEvent` (spec §4.1).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tokio::sync::Mutex;

use booking_core::{BookingError, OrderId};
use booking_domain::saga::message::EventName;
use booking_domain::saga::{wire_segment, Order, SagaMessage};
use booking_domain::{BookingRequest, ResourceKind};
use booking_messaging::EventBus;
use booking_store::saga::order_store;

/// Owns the order aggregate and drives the saga (spec §4.1).
///
/// Per-order serialization is a per-order-id `tokio::sync::Mutex`, created
/// lazily and kept for the process lifetime (spec §5, §9: "a per-order lock
/// in the orchestrator" is one of the three sanctioned options).
pub struct Orchestrator {
    pool: PgPool,
    bus: Arc<dyn EventBus>,
    order_locks: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(pool: PgPool, bus: Arc<dyn EventBus>) -> Self {
        Self {
            pool,
            bus,
            order_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, order_id: OrderId) -> Arc<Mutex<()>> {
        let mut locks = self.order_locks.lock().await;
        locks.entry(order_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Validate, persist the order already `awaiting-confirmation`, then
    /// publish the three reserve-commands (spec §4.1 `StartSaga`).
    ///
    /// The order is written exactly once, so there is no second
    /// read-modify-write to race against `process_saga_event`'s replies
    /// (spec §5: "the read-modify-write of the order row be serialized per
    /// order id").
    ///
    /// Any validation or persistence failure returns an error and publishes
    /// nothing.
    #[tracing::instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn start_saga(&self, user_id: String, request: BookingRequest) -> Result<Order, BookingError> {
        request.validate()?;

        let now = Utc::now();
        let mut order = Order::new(user_id, request, now);
        order.mark_awaiting_confirmation(now)?;
        order_store::insert(&self.pool, &order).await?;

        for kind in ResourceKind::all() {
            self.publish_reserve_command(&order, kind).await;
        }

        Ok(order)
    }

    async fn publish_reserve_command(&self, order: &Order, kind: ResourceKind) {
        let Some(selection) = order.request.selection(kind) else {
            // All three kinds are required by `BookingRequest::validate`, but
            // guard defensively rather than panic on a malformed request.
            tracing::error!(%kind, order_id = %order.id, "order has no selection for resource kind");
            return;
        };

        let payload = match kind {
            ResourceKind::Hotel => json!({
                "hotel_room_id": selection.unit_id,
                "start_date": selection.range.map(|r| r.start),
                "end_date": selection.range.map(|r| r.end),
            }),
            ResourceKind::Car => json!({
                "car_id": selection.unit_id,
                "start_date": selection.range.map(|r| r.start),
                "end_date": selection.range.map(|r| r.end),
            }),
            ResourceKind::Train => json!({ "seat_id": selection.unit_id }),
        };

        let message = SagaMessage::new(EventName::ReserveCommand(kind), order.id.to_string(), payload);
        if let Err(err) = self.bus.publish(message).await {
            // Transport errors during publish are logged and dropped (spec
            // §7): the order stays `awaiting-confirmation` until a manual
            // replay or recovery path re-publishes.
            tracing::warn!(%err, %kind, order_id = %order.id, "failed to publish reserve command");
        }
    }

    /// Apply one reply event, recompute aggregate state, and (on entering a
    /// terminal state) publish compensation or the final event (spec §4.1
    /// `ProcessSagaEvent`).
    ///
    /// Idempotent per (order, event_name): retries on an optimistic-
    /// concurrency conflict, since replies for the same order may race.
    #[tracing::instrument(skip(self, message))]
    pub async fn process_saga_event(&self, message: SagaMessage) -> Result<(), BookingError> {
        let Some(event_name) = message.parsed_event_name() else {
            return Err(BookingError::validation(format!("unrecognized event_name: {}", message.event_name)));
        };
        if !event_name.is_reply() {
            return Err(BookingError::validation(format!(
                "process_saga_event only accepts reply events, got {}",
                message.event_name
            )));
        }

        let order_id: OrderId = message
            .correlation_id
            .parse()
            .map_err(|_| BookingError::validation(format!("invalid correlation_id: {}", message.correlation_id)))?;

        let lock = self.lock_for(order_id).await;
        let _guard = lock.lock().await;

        let kind = match event_name {
            EventName::Reserved(k) | EventName::ReservationFailed(k) => k,
            _ => unreachable!("is_reply() only matches Reserved/ReservationFailed"),
        };

        const MAX_ATTEMPTS: u32 = 5;
        for attempt in 0..MAX_ATTEMPTS {
            let (mut order, version) = order_store::load(&self.pool, order_id).await?;

            let outcome = match event_name {
                EventName::Reserved(_) => {
                    let reservation_id = message
                        .payload
                        .get(format!("{}_reservation_id", wire_segment(kind)))
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| BookingError::validation("reserved event missing reservation id"))?
                        .parse()
                        .map_err(|_| BookingError::validation("reserved event carried an invalid reservation id"))?;
                    Ok(reservation_id)
                }
                EventName::ReservationFailed(_) => {
                    let reason = message
                        .payload
                        .get("failure_reason")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown failure")
                        .to_string();
                    Err(reason)
                }
                _ => unreachable!(),
            };

            order.apply_leg_reply(kind, outcome, Utc::now());

            match order_store::save(&self.pool, &order, version).await {
                Ok(_) => {
                    self.drive_terminal_effects(&order).await;
                    return Ok(());
                }
                Err(BookingError::Conflict(_)) if attempt + 1 < MAX_ATTEMPTS => continue,
                Err(err) => return Err(err),
            }
        }

        Err(BookingError::conflict(format!(
            "order {order_id} update lost the optimistic-concurrency race {MAX_ATTEMPTS} times in a row"
        )))
    }

    /// Publish compensation cancel-commands and/or the terminal event, each
    /// exactly once (spec §4.1 compensation rule, final events).
    async fn drive_terminal_effects(&self, order: &Order) {
        if order.needs_compensation() {
            for kind in ResourceKind::all() {
                let message = SagaMessage::new(EventName::CancelCommand(kind), order.id.to_string(), json!({ "order_id": order.id.to_string() }));
                if let Err(err) = self.bus.publish(message).await {
                    tracing::warn!(%err, %kind, order_id = %order.id, "failed to publish cancel command");
                }
            }
            if let Ok((mut order, version)) = order_store::load(&self.pool, order.id).await {
                order.mark_compensation_published();
                let _ = order_store::save(&self.pool, &order, version).await;
            }
        }

        if order.needs_final_event() {
            let event_name = if order.status == booking_domain::saga::OrderStatus::Booked {
                EventName::OrderBooked
            } else {
                EventName::OrderFailed
            };
            let message = SagaMessage::new(event_name, order.id.to_string(), json!({ "order_id": order.id.to_string() }));
            if let Err(err) = self.bus.publish(message).await {
                tracing::warn!(%err, order_id = %order.id, "failed to publish final order event");
            }
            if let Ok((mut order, version)) = order_store::load(&self.pool, order.id).await {
                order.mark_final_event_published();
                let _ = order_store::save(&self.pool, &order, version).await;
            }
        }
    }
}
