//! 2PC participant inventory: Prepare/Commit/Abort, each a single atomic
//! store transaction (spec §4.4).

use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use booking_core::{BookingError, ReservationId, TransactionId};
use booking_domain::twopc::{ParticipantLog, ParticipantLogStatus};
use booking_domain::{DateRange, ResourceKind};

fn dates_for(kind: ResourceKind, range: Option<DateRange>) -> Result<Vec<NaiveDate>, BookingError> {
    match (kind.has_date_range(), range) {
        (true, Some(range)) => Ok(range.days().collect()),
        (false, None) => Ok(vec![NaiveDate::MIN]),
        (true, None) => Err(BookingError::validation(format!("{kind} selection requires a date range"))),
        (false, Some(_)) => Err(BookingError::validation(format!("{kind} selection must not carry a date range"))),
    }
}

fn log_status_to_str(status: ParticipantLogStatus) -> &'static str {
    match status {
        ParticipantLogStatus::Prepared => "prepared",
        ParticipantLogStatus::Committed => "committed",
        ParticipantLogStatus::Aborted => "aborted",
    }
}

fn log_status_from_str(s: &str) -> Result<ParticipantLogStatus, BookingError> {
    match s {
        "prepared" => Ok(ParticipantLogStatus::Prepared),
        "committed" => Ok(ParticipantLogStatus::Committed),
        "aborted" => Ok(ParticipantLogStatus::Aborted),
        other => Err(BookingError::internal(format!("unknown participant log status: {other}"))),
    }
}

async fn read_log(pool: &PgPool, transaction_id: TransactionId) -> Result<Option<ParticipantLog>, BookingError> {
    let row = sqlx::query(
        "SELECT transaction_id, status, reservation_id, created_at, updated_at
         FROM twophase_participant_logs WHERE transaction_id = $1",
    )
    .bind(transaction_id.as_uuid())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };
    Ok(Some(ParticipantLog {
        transaction_id: TransactionId::from_uuid(row.try_get("transaction_id")?),
        status: log_status_from_str(&row.try_get::<String, _>("status")?)?,
        reservation_id: ReservationId::from_uuid(row.try_get("reservation_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    }))
}

/// Prepare: idempotent by transaction id (spec §4.4). Returns the existing
/// log unchanged if this transaction was already prepared; otherwise checks
/// and holds every affected availability row, creates the reservation, and
/// writes the `prepared` log row, all in one transaction.
#[instrument(skip(pool), fields(kind = %kind, unit_id = %unit_id))]
pub async fn prepare(
    pool: &PgPool,
    transaction_id: TransactionId,
    kind: ResourceKind,
    unit_id: &str,
    range: Option<DateRange>,
) -> Result<ParticipantLog, BookingError> {
    if let Some(existing) = read_log(pool, transaction_id).await? {
        return Ok(existing);
    }

    let dates = dates_for(kind, range)?;
    let mut tx = pool.begin().await?;

    for date in &dates {
        let row = sqlx::query(
            "SELECT held_by FROM twophase_availability WHERE kind = $1 AND unit_id = $2 AND date = $3 FOR UPDATE",
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
        sqlx::query("UPDATE twophase_availability SET held_by = $1 WHERE kind = $2 AND unit_id = $3 AND date = $4")
            .bind(transaction_id.to_string())
            .bind(kind.as_str())
            .bind(unit_id)
            .bind(date)
            .execute(&mut *tx)
            .await?;
    }

    let reservation_id = ReservationId::new();
    let (start, end) = (dates.first().copied(), dates.last().copied());
    sqlx::query(
        "INSERT INTO twophase_reservations (id, transaction_id, kind, unit_id, start_date, end_date, status)
         VALUES ($1, $2, $3, $4, $5, $6, 'reserved')",
    )
    .bind(reservation_id.as_uuid())
    .bind(transaction_id.as_uuid())
    .bind(kind.as_str())
    .bind(unit_id)
    .bind(if kind.has_date_range() { start } else { None })
    .bind(if kind.has_date_range() { end } else { None })
    .execute(&mut *tx)
    .await?;

    let now = Utc::now();
    let inserted = sqlx::query(
        "INSERT INTO twophase_participant_logs (transaction_id, kind, status, reservation_id, created_at, updated_at)
         VALUES ($1, $2, 'prepared', $3, $4, $4)
         ON CONFLICT (transaction_id, kind) DO NOTHING",
    )
    .bind(transaction_id.as_uuid())
    .bind(kind.as_str())
    .bind(reservation_id.as_uuid())
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() == 0 {
        // Lost a race with a concurrent prepare for the same transaction:
        // discard this attempt's hold and return the winner's log instead.
        tx.rollback().await?;
        return read_log(pool, transaction_id)
            .await?
            .ok_or_else(|| BookingError::internal("participant log vanished after losing prepare race"));
    }

    tx.commit().await?;
    Ok(ParticipantLog {
        transaction_id,
        status: ParticipantLogStatus::Prepared,
        reservation_id,
        created_at: now,
        updated_at: now,
    })
}

/// Commit: flip the log row `prepared -> committed`. No-op if already
/// terminal (spec §4.4 Commit).
#[instrument(skip(pool))]
pub async fn commit(pool: &PgPool, transaction_id: TransactionId) -> Result<ParticipantLog, BookingError> {
    let mut log = read_log(pool, transaction_id).await?.ok_or(BookingError::NotFound)?;
    let now = Utc::now();
    log.commit(now)?;

    sqlx::query("UPDATE twophase_participant_logs SET status = $1, updated_at = $2 WHERE transaction_id = $3")
        .bind(log_status_to_str(log.status))
        .bind(now)
        .bind(transaction_id.as_uuid())
        .execute(pool)
        .await?;
    Ok(log)
}

/// Abort: release every availability row consumed by this transaction's
/// reservation, cancel the reservation, and flip the log row to `aborted`
/// (spec §4.4 Abort). No-op unless the log row is `prepared`.
#[instrument(skip(pool))]
pub async fn abort(pool: &PgPool, transaction_id: TransactionId) -> Result<Option<ParticipantLog>, BookingError> {
    let Some(mut log) = read_log(pool, transaction_id).await? else {
        // Unknown transaction id: a no-op success (spec §8 boundary case).
        return Ok(None);
    };

    let now = Utc::now();
    if !log.abort(now) {
        return Ok(Some(log));
    }

    let mut tx = pool.begin().await?;

    let row = sqlx::query("SELECT unit_id, kind, start_date, end_date FROM twophase_reservations WHERE id = $1")
        .bind(log.reservation_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;
    let unit_id: String = row.try_get("unit_id")?;
    let kind_str: String = row.try_get("kind")?;
    let start_date: Option<NaiveDate> = row.try_get("start_date")?;
    let end_date: Option<NaiveDate> = row.try_get("end_date")?;

    let dates: Vec<NaiveDate> = match (start_date, end_date) {
        (Some(start), Some(end)) => DateRange::new(start, end)?.days().collect(),
        _ => vec![NaiveDate::MIN],
    };

    for date in &dates {
        sqlx::query(
            "UPDATE twophase_availability SET held_by = NULL
             WHERE kind = $1 AND unit_id = $2 AND date = $3 AND held_by = $4",
        )
        .bind(&kind_str)
        .bind(&unit_id)
        .bind(date)
        .bind(transaction_id.to_string())
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE twophase_reservations SET status = 'cancelled' WHERE id = $1")
        .bind(log.reservation_id.as_uuid())
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE twophase_participant_logs SET status = 'aborted', updated_at = $1 WHERE transaction_id = $2")
        .bind(now)
        .bind(transaction_id.as_uuid())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(log))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_room(pool: &PgPool, unit_id: &str, date: NaiveDate) {
        sqlx::query("INSERT INTO twophase_availability (kind, unit_id, date, held_by) VALUES ($1, $2, $3, NULL)")
            .bind(ResourceKind::Hotel.as_str())
            .bind(unit_id)
            .bind(date)
            .execute(pool)
            .await
            .unwrap();
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn prepare_is_idempotent_for_the_same_transaction(pool: PgPool) {
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        seed_room(&pool, "room-1", date).await;
        let range = Some(DateRange::new(date, date).unwrap());
        let transaction_id = TransactionId::new();

        let first = prepare(&pool, transaction_id, ResourceKind::Hotel, "room-1", range.clone()).await.unwrap();
        let second = prepare(&pool, transaction_id, ResourceKind::Hotel, "room-1", range).await.unwrap();
        assert_eq!(first.reservation_id, second.reservation_id);
        assert_eq!(second.status, ParticipantLogStatus::Prepared);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn commit_then_commit_again_is_a_no_op(pool: PgPool) {
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        seed_room(&pool, "room-1", date).await;
        let range = Some(DateRange::new(date, date).unwrap());
        let transaction_id = TransactionId::new();

        prepare(&pool, transaction_id, ResourceKind::Hotel, "room-1", range).await.unwrap();
        let committed = commit(&pool, transaction_id).await.unwrap();
        assert_eq!(committed.status, ParticipantLogStatus::Committed);
        let committed_again = commit(&pool, transaction_id).await.unwrap();
        assert_eq!(committed_again.status, ParticipantLogStatus::Committed);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn abort_on_unknown_transaction_is_a_no_op(pool: PgPool) {
        let result = abort(&pool, TransactionId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn abort_after_prepare_releases_the_room(pool: PgPool) {
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        seed_room(&pool, "room-1", date).await;
        let range = Some(DateRange::new(date, date).unwrap());
        let transaction_id = TransactionId::new();

        prepare(&pool, transaction_id, ResourceKind::Hotel, "room-1", range).await.unwrap();
        let aborted = abort(&pool, transaction_id).await.unwrap().unwrap();
        assert_eq!(aborted.status, ParticipantLogStatus::Aborted);

        let held: Option<String> = sqlx::query("SELECT held_by FROM twophase_availability WHERE kind = 'hotel' AND unit_id = 'room-1' AND date = $1")
            .bind(date)
            .fetch_one(&pool)
            .await
            .unwrap()
            .try_get("held_by")
            .unwrap();
        assert!(held.is_none());
    }
}
