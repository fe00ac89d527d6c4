//! Persistence for the coordinator's `TransactionLog` (spec §3.4, §4.3).

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use booking_core::{BookingError, OrderId, TransactionId};
use booking_domain::twopc::{TransactionLog, TxStatus};

fn status_to_str(status: TxStatus) -> &'static str {
    match status {
        TxStatus::Initiated => "initiated",
        TxStatus::Prepared => "prepared",
        TxStatus::Committed => "committed",
        TxStatus::Aborted => "aborted",
        TxStatus::RolledBack => "rolled-back",
        TxStatus::TimedOut => "timed-out",
    }
}

fn status_from_str(s: &str) -> Result<TxStatus, BookingError> {
    match s {
        "initiated" => Ok(TxStatus::Initiated),
        "prepared" => Ok(TxStatus::Prepared),
        "committed" => Ok(TxStatus::Committed),
        "aborted" => Ok(TxStatus::Aborted),
        "rolled-back" => Ok(TxStatus::RolledBack),
        "timed-out" => Ok(TxStatus::TimedOut),
        other => Err(BookingError::internal(format!("unknown transaction status in store: {other}"))),
    }
}

fn row_to_log(row: &sqlx::postgres::PgRow) -> Result<(TransactionLog, i64), BookingError> {
    let participants_value: serde_json::Value = row.try_get("participants")?;
    let participants = serde_json::from_value(participants_value)
        .map_err(|e| BookingError::internal(format!("failed to deserialize participants: {e}")))?;

    let log = TransactionLog {
        id: TransactionId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        status: status_from_str(&row.try_get::<String, _>("status")?)?,
        participants,
        timeout_at: row.try_get("timeout_at")?,
        max_retries: row.try_get::<i32, _>("max_retries")? as u32,
        failure_reason: row.try_get("failure_reason")?,
        done_at: row.try_get("done_at")?,
        commit_timestamp: row.try_get("commit_timestamp")?,
        version: row.try_get("version")?,
    };
    let version = log.version;
    Ok((log, version))
}

#[instrument(skip(pool, log), fields(transaction_id = %log.id))]
pub async fn insert(pool: &PgPool, log: &TransactionLog) -> Result<(), BookingError> {
    let participants = serde_json::to_value(&log.participants)
        .map_err(|e| BookingError::internal(format!("failed to serialize participants: {e}")))?;

    sqlx::query(
        "INSERT INTO twophase_transactions
            (id, order_id, status, participants, timeout_at, max_retries, failure_reason,
             done_at, commit_timestamp, version)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(log.id.as_uuid())
    .bind(log.order_id.as_uuid())
    .bind(status_to_str(log.status))
    .bind(participants)
    .bind(log.timeout_at)
    .bind(log.max_retries as i32)
    .bind(&log.failure_reason)
    .bind(log.done_at)
    .bind(log.commit_timestamp)
    .bind(log.version)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn load(pool: &PgPool, transaction_id: TransactionId) -> Result<(TransactionLog, i64), BookingError> {
    let row = sqlx::query(
        "SELECT id, order_id, status, participants, timeout_at, max_retries, failure_reason,
                done_at, commit_timestamp, version
         FROM twophase_transactions WHERE id = $1",
    )
    .bind(transaction_id.as_uuid())
    .fetch_optional(pool)
    .await?
    .ok_or(BookingError::NotFound)?;
    row_to_log(&row)
}

/// Write back a mutated log, guarded by the version read alongside it.
/// Returns `Conflict` if another writer updated the row first.
#[instrument(skip(pool, log), fields(transaction_id = %log.id, expected_version))]
pub async fn save(pool: &PgPool, log: &TransactionLog, expected_version: i64) -> Result<i64, BookingError> {
    let participants = serde_json::to_value(&log.participants)
        .map_err(|e| BookingError::internal(format!("failed to serialize participants: {e}")))?;

    let result = sqlx::query(
        "UPDATE twophase_transactions SET
            status = $1, participants = $2, failure_reason = $3, done_at = $4,
            commit_timestamp = $5, version = version + 1
         WHERE id = $6 AND version = $7",
    )
    .bind(status_to_str(log.status))
    .bind(participants)
    .bind(&log.failure_reason)
    .bind(log.done_at)
    .bind(log.commit_timestamp)
    .bind(log.id.as_uuid())
    .bind(expected_version)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(BookingError::conflict(format!(
            "transaction {} was updated concurrently (expected version {expected_version})",
            log.id
        )));
    }
    Ok(expected_version + 1)
}

/// Transactions the sweeper should inspect: `initiated`/`prepared` whose
/// deadline has passed (spec §4.3 timeout sweeper).
#[instrument(skip(pool))]
pub async fn list_timed_out(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<(TransactionLog, i64)>, BookingError> {
    let rows = sqlx::query(
        "SELECT id, order_id, status, participants, timeout_at, max_retries, failure_reason,
                done_at, commit_timestamp, version
         FROM twophase_transactions
         WHERE status IN ('initiated', 'prepared') AND timeout_at <= $1",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_log).collect()
}

/// Transactions in a non-terminal state at startup, for the recovery pass
/// (spec §9 "coordinator-crash recovery": load non-terminal logs, rely on
/// the sweeper rather than resuming in-flight protocol steps).
#[instrument(skip(pool))]
pub async fn list_non_terminal(pool: &PgPool) -> Result<Vec<(TransactionLog, i64)>, BookingError> {
    let rows = sqlx::query(
        "SELECT id, order_id, status, participants, timeout_at, max_retries, failure_reason,
                done_at, commit_timestamp, version
         FROM twophase_transactions
         WHERE status IN ('initiated', 'prepared')",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_log).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_domain::ResourceKind;

    fn new_log(timeout_at: DateTime<Utc>) -> TransactionLog {
        let endpoints = vec![
            (ResourceKind::Hotel, "http://hotel".to_string()),
            (ResourceKind::Car, "http://car".to_string()),
            (ResourceKind::Train, "http://train".to_string()),
        ];
        TransactionLog::new(OrderId::new(), &endpoints, timeout_at, 3)
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn insert_then_load_round_trips(pool: PgPool) {
        let log = new_log(Utc::now() + chrono::Duration::seconds(30));
        insert(&pool, &log).await.unwrap();

        let (loaded, version) = load(&pool, log.id).await.unwrap();
        assert_eq!(loaded.id, log.id);
        assert_eq!(loaded.status, TxStatus::Initiated);
        assert_eq!(version, 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn save_with_stale_version_is_a_conflict(pool: PgPool) {
        let mut log = new_log(Utc::now() + chrono::Duration::seconds(30));
        insert(&pool, &log).await.unwrap();
        log.start_prepare_phase(Utc::now()).unwrap();

        save(&pool, &log, 0).await.unwrap();
        let err = save(&pool, &log, 0).await.unwrap_err();
        assert!(matches!(err, BookingError::Conflict(_)));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_timed_out_only_returns_expired_non_terminal_transactions(pool: PgPool) {
        let expired = new_log(Utc::now() - chrono::Duration::seconds(1));
        let fresh = new_log(Utc::now() + chrono::Duration::seconds(60));
        insert(&pool, &expired).await.unwrap();
        insert(&pool, &fresh).await.unwrap();

        let timed_out = list_timed_out(&pool, Utc::now()).await.unwrap();
        assert_eq!(timed_out.len(), 1);
        assert_eq!(timed_out[0].0.id, expired.id);
    }
}
