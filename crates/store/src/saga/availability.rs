//! Saga reserve/cancel: the single atomic write each participant performs
//! (spec §4.2).

use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::instrument;

use booking_core::{BookingError, ReservationId};
use booking_domain::{DateRange, ResourceKind};

/// Dates to touch for one selection: every day in the range for hotel/car,
/// or a single sentinel date for train (spec §3.2: "train seats have no
/// date dimension and use one record per seat").
fn dates_for(kind: ResourceKind, range: Option<DateRange>) -> Result<Vec<NaiveDate>, BookingError> {
    match (kind.has_date_range(), range) {
        (true, Some(range)) => Ok(range.days().collect()),
        (false, None) => Ok(vec![NaiveDate::MIN]),
        (true, None) => Err(BookingError::validation(format!("{kind} selection requires a date range"))),
        (false, Some(_)) => Err(BookingError::validation(format!("{kind} selection must not carry a date range"))),
    }
}

/// Reserve `unit_id` for `order_id` over `range` (or the sentinel date for a
/// seat), inside one transaction: check every affected availability row,
/// flip them held, and insert the reservation (spec §4.2 Reserve handler).
#[instrument(skip(pool), fields(kind = %kind, unit_id = %unit_id))]
pub async fn reserve(
    pool: &PgPool,
    order_id: &str,
    kind: ResourceKind,
    unit_id: &str,
    range: Option<DateRange>,
) -> Result<ReservationId, BookingError> {
    let dates = dates_for(kind, range)?;
    let mut tx = pool.begin().await?;

    for date in &dates {
        let row = sqlx::query(
            "SELECT held_by FROM availability WHERE kind = $1 AND unit_id = $2 AND date = $3 FOR UPDATE",
        )
        .bind(kind.as_str())
        .bind(unit_id)
        .bind(date)
        .fetch_optional(&mut *tx)
        .await?;

        let held_by: Option<String> = match row {
            Some(row) => row.try_get("held_by")?,
            None => {
                return Err(BookingError::not_available(format!(
                    "{kind} unit {unit_id} has no availability record for {date}"
                )))
            }
        };
        if held_by.is_some() {
            return Err(BookingError::not_available(format!(
                "{kind} unit {unit_id} is already held on {date}"
            )));
        }
    }

    for date in &dates {
        sqlx::query("UPDATE availability SET held_by = $1 WHERE kind = $2 AND unit_id = $3 AND date = $4")
            .bind(order_id)
            .bind(kind.as_str())
            .bind(unit_id)
            .bind(date)
            .execute(&mut *tx)
            .await?;
    }

    let reservation_id = ReservationId::new();
    let (start, end) = (dates.first().copied(), dates.last().copied());
    sqlx::query(
        "INSERT INTO reservations (id, order_id, kind, unit_id, start_date, end_date, status)
         VALUES ($1, $2, $3, $4, $5, $6, 'reserved')",
    )
    .bind(reservation_id.as_uuid())
    .bind(order_id)
    .bind(kind.as_str())
    .bind(unit_id)
    .bind(if kind.has_date_range() { start } else { None })
    .bind(if kind.has_date_range() { end } else { None })
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(reservation_id)
}

/// Release whatever `order_id` holds in this domain, or no-op if nothing is
/// held (spec §4.2 Cancel handler: idempotency the orchestrator relies on).
#[instrument(skip(pool), fields(kind = %kind))]
pub async fn cancel(pool: &PgPool, order_id: &str, kind: ResourceKind) -> Result<(), BookingError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        "SELECT id, unit_id, start_date, end_date FROM reservations
         WHERE order_id = $1 AND kind = $2 AND status = 'reserved' FOR UPDATE",
    )
    .bind(order_id)
    .bind(kind.as_str())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        // Nothing held for this order: a no-op success (spec §4.2, §8
        // "Abort on unknown transaction id is a no-op success" — the saga
        // analogue).
        return Ok(());
    };

    let reservation_id: uuid::Uuid = row.try_get("id")?;
    let unit_id: String = row.try_get("unit_id")?;
    let start_date: Option<NaiveDate> = row.try_get("start_date")?;
    let end_date: Option<NaiveDate> = row.try_get("end_date")?;

    let dates: Vec<NaiveDate> = match (start_date, end_date) {
        (Some(start), Some(end)) => DateRange::new(start, end)?.days().collect(),
        _ => vec![NaiveDate::MIN],
    };

    for date in &dates {
        sqlx::query(
            "UPDATE availability SET held_by = NULL
             WHERE kind = $1 AND unit_id = $2 AND date = $3 AND held_by = $4",
        )
        .bind(kind.as_str())
        .bind(&unit_id)
        .bind(date)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE reservations SET status = 'cancelled' WHERE id = $1")
        .bind(reservation_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
