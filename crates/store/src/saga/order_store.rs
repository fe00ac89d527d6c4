//! Persistence for the saga `Order` aggregate, with optimistic concurrency
//! on `version` (spec §5 ordering guarantees, §9 per-order serialization).

use sqlx::{PgPool, Row};
use tracing::instrument;

use booking_core::{BookingError, OrderId};
use booking_domain::saga::Order;

/// Insert a freshly-created order (status `pending`, version 0).
#[instrument(skip(pool, order), fields(order_id = %order.id))]
pub async fn insert(pool: &PgPool, order: &Order) -> Result<(), BookingError> {
    let legs = serde_json::to_value(&order.legs)
        .map_err(|e| BookingError::internal(format!("failed to serialize order legs: {e}")))?;
    let request = serde_json::to_value(&order.request)
        .map_err(|e| BookingError::internal(format!("failed to serialize order request: {e}")))?;

    sqlx::query(
        "INSERT INTO orders
            (id, user_id, status, request, legs, compensation_published, final_event_published,
             created_at, updated_at, version)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(order.id.as_uuid())
    .bind(&order.user_id)
    .bind(status_to_str(order.status))
    .bind(request)
    .bind(legs)
    .bind(order.compensation_published)
    .bind(order.final_event_published)
    .bind(order.created_at)
    .bind(order.updated_at)
    .bind(0i64)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn load(pool: &PgPool, order_id: OrderId) -> Result<(Order, i64), BookingError> {
    let row = sqlx::query(
        "SELECT id, user_id, status, request, legs, compensation_published, final_event_published,
                created_at, updated_at, version
         FROM orders WHERE id = $1",
    )
    .bind(order_id.as_uuid())
    .fetch_optional(pool)
    .await?
    .ok_or(BookingError::NotFound)?;

    let legs_value: serde_json::Value = row.try_get("legs")?;
    let legs = serde_json::from_value(legs_value)
        .map_err(|e| BookingError::internal(format!("failed to deserialize order legs: {e}")))?;
    let request_value: serde_json::Value = row.try_get("request")?;
    let request = serde_json::from_value(request_value)
        .map_err(|e| BookingError::internal(format!("failed to deserialize order request: {e}")))?;

    let order = Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        user_id: row.try_get("user_id")?,
        status: status_from_str(&row.try_get::<String, _>("status")?)?,
        request,
        legs,
        compensation_published: row.try_get("compensation_published")?,
        final_event_published: row.try_get("final_event_published")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    };
    let version: i64 = row.try_get("version")?;
    Ok((order, version))
}

/// Write back a mutated order, guarded by the version read alongside it
/// (spec §9: "optimistic concurrency on a version field with retry").
/// Returns `Conflict` if another writer updated the row first; callers
/// re-read and retry.
#[instrument(skip(pool, order), fields(order_id = %order.id, expected_version))]
pub async fn save(pool: &PgPool, order: &Order, expected_version: i64) -> Result<i64, BookingError> {
    let legs = serde_json::to_value(&order.legs)
        .map_err(|e| BookingError::internal(format!("failed to serialize order legs: {e}")))?;

    let result = sqlx::query(
        "UPDATE orders SET
            status = $1, legs = $2, compensation_published = $3, final_event_published = $4,
            updated_at = $5, version = version + 1
         WHERE id = $6 AND version = $7",
    )
    .bind(status_to_str(order.status))
    .bind(legs)
    .bind(order.compensation_published)
    .bind(order.final_event_published)
    .bind(order.updated_at)
    .bind(order.id.as_uuid())
    .bind(expected_version)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(BookingError::conflict(format!(
            "order {} was updated concurrently (expected version {expected_version})",
            order.id
        )));
    }
    Ok(expected_version + 1)
}

fn status_to_str(status: booking_domain::saga::OrderStatus) -> &'static str {
    use booking_domain::saga::OrderStatus::*;
    match status {
        Pending => "pending",
        AwaitingConfirmation => "awaiting-confirmation",
        Booked => "booked",
        Failed => "failed",
    }
}

fn status_from_str(s: &str) -> Result<booking_domain::saga::OrderStatus, BookingError> {
    use booking_domain::saga::OrderStatus::*;
    match s {
        "pending" => Ok(Pending),
        "awaiting-confirmation" => Ok(AwaitingConfirmation),
        "booked" => Ok(Booked),
        "failed" => Ok(Failed),
        other => Err(BookingError::internal(format!("unknown order status in store: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_domain::request::ResourceSelection;
    use booking_domain::{BookingRequest, DateRange, ResourceKind};
    use chrono::{NaiveDate, Utc};

    fn sample_request() -> BookingRequest {
        BookingRequest {
            customer_id: "user-1".to_string(),
            selections: vec![
                ResourceSelection {
                    kind: ResourceKind::Hotel,
                    unit_id: "room-1".to_string(),
                    range: Some(DateRange::new(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(), NaiveDate::from_ymd_opt(2026, 6, 3).unwrap()).unwrap()),
                },
                ResourceSelection {
                    kind: ResourceKind::Car,
                    unit_id: "car-1".to_string(),
                    range: Some(DateRange::new(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(), NaiveDate::from_ymd_opt(2026, 6, 3).unwrap()).unwrap()),
                },
                ResourceSelection {
                    kind: ResourceKind::Train,
                    unit_id: "seat-1".to_string(),
                    range: None,
                },
            ],
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn insert_then_load_round_trips(pool: PgPool) {
        let order = Order::new("user-1", sample_request(), Utc::now());
        insert(&pool, &order).await.unwrap();

        let (loaded, version) = load(&pool, order.id).await.unwrap();
        assert_eq!(loaded.id, order.id);
        assert_eq!(loaded.status, booking_domain::saga::OrderStatus::Pending);
        assert_eq!(version, 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn save_with_stale_version_is_a_conflict(pool: PgPool) {
        let mut order = Order::new("user-1", sample_request(), Utc::now());
        insert(&pool, &order).await.unwrap();
        order.updated_at = Utc::now();

        save(&pool, &order, 0).await.unwrap();
        let err = save(&pool, &order, 0).await.unwrap_err();
        assert!(matches!(err, BookingError::Conflict(_)));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn load_unknown_order_is_not_found(pool: PgPool) {
        let err = load(&pool, OrderId::new()).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound));
    }
}
