//! The 2PC protocol engine: Initiate, Prepare, Commit, Abort, Rollback
//! (spec §4.3).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

use booking_core::{BookingError, OrderId, TransactionId};
use booking_domain::twopc::TransactionLog;
use booking_domain::{BookingRequest, ResourceKind};
use booking_store::twopc::transaction_store;

use crate::client::ParticipantClient;

/// Owns the participant client and endpoint table; one instance is shared
/// (via `Arc`) across the HTTP task and every spawned per-transaction
/// driver task (spec §5: "one asynchronous worker per accepted
/// transaction").
#[derive(Clone)]
pub struct Coordinator {
    pool: PgPool,
    client: Arc<ParticipantClient>,
    endpoints: Vec<(ResourceKind, String)>,
    max_retries: u32,
    transaction_timeout: Duration,
}

impl Coordinator {
    pub fn new(
        pool: PgPool,
        client: Arc<ParticipantClient>,
        endpoints: Vec<(ResourceKind, String)>,
        max_retries: u32,
        transaction_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            client,
            endpoints,
            max_retries,
            transaction_timeout,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Sweeper-driven abort of a timed-out transaction: finalize as
    /// `timed-out` (not `aborted`) and best-effort Abort every participant
    /// (spec §4.3 "Timeout sweeper", §9 "sweeper-only recovery").
    pub async fn abort_for_timeout(&self, log: &mut TransactionLog, version: i64) {
        for (_, endpoint) in self.endpoints.clone() {
            self.client.abort(&endpoint, log.id).await;
        }
        log.finalize_timed_out(Utc::now());
        if let Err(err) = transaction_store::save(&self.pool, log, version).await {
            tracing::error!(%err, transaction_id = %log.id, "failed to persist timed-out state");
        }
    }

    /// Persist the initial TransactionLog and spawn the asynchronous driver
    /// (spec §4.3 step 1: "Return `(order_id, transaction_id, initiated)`
    /// to the client immediately; subsequent phases run asynchronously").
    #[tracing::instrument(skip(self, request))]
    pub async fn initiate(self: &Arc<Self>, request: BookingRequest) -> Result<(OrderId, TransactionId), BookingError> {
        request.validate()?;

        let order_id = OrderId::new();
        let now = Utc::now();
        let timeout_at = now + chrono::Duration::from_std(self.transaction_timeout).unwrap_or_default();
        let log = TransactionLog::new(order_id, &self.endpoints, timeout_at, self.max_retries);
        let transaction_id = log.id;

        transaction_store::insert(&self.pool, &log).await?;

        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.drive(transaction_id, request).await });

        Ok((order_id, transaction_id))
    }

    /// Drive Prepare then Commit across all participants in fixed order
    /// (spec §4.3 steps 2-4).
    #[tracing::instrument(skip(self, request), fields(%transaction_id))]
    async fn drive(&self, transaction_id: TransactionId, request: BookingRequest) {
        let Ok((mut log, mut version)) = transaction_store::load(&self.pool, transaction_id).await else {
            tracing::error!(%transaction_id, "driver could not load its own transaction log");
            return;
        };

        log.start_prepare_phase(Utc::now()).expect("freshly initiated transaction can start prepare");
        match transaction_store::save(&self.pool, &log, version).await {
            Ok(v) => version = v,
            Err(err) => {
                tracing::error!(%err, %transaction_id, "failed to persist prepare-phase start");
                return;
            }
        }

        for (kind, endpoint) in self.endpoints.clone() {
            let Some(payload) = payload_for(kind, log.order_id, &request) else {
                log.record_prepare_failure(kind, "no selection for resource kind", Utc::now());
                match transaction_store::save(&self.pool, &log, version).await {
                    Ok(v) => version = v,
                    Err(err) => tracing::error!(%err, %transaction_id, "failed to persist prepare failure"),
                }
                self.run_abort(&mut log, version, "missing resource selection").await;
                return;
            };

            let (success, message, retries) = self.client.prepare(&endpoint, transaction_id, &log.order_id.to_string(), payload).await;
            for _ in 0..retries {
                log.bump_retry(kind);
            }

            if success {
                log.record_prepare_success(kind, Utc::now());
            } else {
                log.record_prepare_failure(kind, message.clone(), Utc::now());
                match transaction_store::save(&self.pool, &log, version).await {
                    Ok(v) => version = v,
                    Err(err) => tracing::error!(%err, %transaction_id, "failed to persist prepare failure"),
                }
                self.run_abort(&mut log, version, &format!("{kind}: {message}")).await;
                return;
            }

            match transaction_store::save(&self.pool, &log, version).await {
                Ok(v) => version = v,
                Err(err) => {
                    tracing::error!(%err, %transaction_id, "failed to persist prepare progress");
                    return;
                }
            }
        }

        debug_assert!(log.all_prepared());

        for (kind, endpoint) in self.endpoints.clone() {
            let (success, message, retries) = self.client.commit(&endpoint, transaction_id).await;
            for _ in 0..retries {
                log.bump_retry(kind);
            }

            if !success {
                log.finalize_rolled_back(format!("{kind}: {message}"), Utc::now());
                if let Err(err) = transaction_store::save(&self.pool, &log, version).await {
                    tracing::error!(%err, %transaction_id, "failed to persist rollback");
                }
                tracing::error!(%transaction_id, %kind, "commit failed after retries; transaction rolled back, manual reconciliation required");
                return;
            }
            log.record_commit_success(kind, Utc::now());
            match transaction_store::save(&self.pool, &log, version).await {
                Ok(v) => version = v,
                Err(err) => {
                    tracing::error!(%err, %transaction_id, "failed to persist commit progress");
                    return;
                }
            }
        }

        log.finalize_committed(Utc::now());
        if let Err(err) = transaction_store::save(&self.pool, &log, version).await {
            tracing::error!(%err, %transaction_id, "failed to persist final committed state");
        }
    }

    /// Best-effort Abort to every participant, then finalize the log as
    /// `aborted` (spec §4.3 step 2 / Abort phase).
    async fn run_abort(&self, log: &mut TransactionLog, version: i64, reason: &str) {
        for (_, endpoint) in self.endpoints.clone() {
            self.client.abort(&endpoint, log.id).await;
        }
        log.finalize_aborted(reason, Utc::now());
        if let Err(err) = transaction_store::save(&self.pool, log, version).await {
            tracing::error!(%err, transaction_id = %log.id, "failed to persist aborted state");
        }
    }
}

fn date_iso(date: chrono::NaiveDate) -> String {
    booking_domain::date_range::format_iso(date)
}

/// Build the Prepare payload for `kind`'s participant out of the client's
/// booking request (spec §6.1 "2PC participant" payload shapes).
fn payload_for(kind: ResourceKind, order_id: OrderId, request: &BookingRequest) -> Option<serde_json::Value> {
    let selection = request.selection(kind)?;
    let start = selection.range.map(|r| date_iso(r.start));
    let end = selection.range.map(|r| date_iso(r.end));
    Some(match kind {
        ResourceKind::Hotel => json!({
            "hotel_room_id": selection.unit_id,
            "hotel_room_start_date": start,
            "hotel_room_end_date": end,
            "order_id": order_id.to_string(),
        }),
        ResourceKind::Car => json!({
            "car_id": selection.unit_id,
            "car_start_date": start,
            "car_end_date": end,
            "order_id": order_id.to_string(),
        }),
        ResourceKind::Train => json!({
            "train_seat_id": selection.unit_id,
            "order_id": order_id.to_string(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_domain::date_range::DateRange;
    use booking_domain::request::ResourceSelection;
    use chrono::NaiveDate;

    fn request() -> BookingRequest {
        BookingRequest {
            customer_id: "cust-1".to_string(),
            selections: vec![
                ResourceSelection {
                    kind: ResourceKind::Hotel,
                    unit_id: "room-1".to_string(),
                    range: Some(DateRange::new(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), NaiveDate::from_ymd_opt(2026, 3, 3).unwrap()).unwrap()),
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
    fn hotel_payload_carries_date_range() {
        let order_id = OrderId::new();
        let payload = payload_for(ResourceKind::Hotel, order_id, &request()).unwrap();
        assert_eq!(payload["hotel_room_id"], "room-1");
        assert_eq!(payload["hotel_room_start_date"], "2026-03-01");
        assert_eq!(payload["hotel_room_end_date"], "2026-03-03");
    }

    #[test]
    fn train_payload_has_no_date_fields() {
        let order_id = OrderId::new();
        let payload = payload_for(ResourceKind::Train, order_id, &request()).unwrap();
        assert_eq!(payload["train_seat_id"], "seat-1");
        assert!(payload.get("start_date").is_none());
    }

    #[test]
    fn missing_selection_returns_none() {
        let order_id = OrderId::new();
        assert!(payload_for(ResourceKind::Car, order_id, &request()).is_none());
    }
}
