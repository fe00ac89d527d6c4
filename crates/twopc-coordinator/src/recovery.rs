//! Startup recovery pass (spec §9 "coordinator-crash recovery"): log every
//! non-terminal transaction and do nothing else. A fresh coordinator
//! instance never resumes driving a transaction it did not itself spawn;
//! the sweeper is what moves these forward, once their deadline passes.

use sqlx::PgPool;

use booking_store::twopc::transaction_store;

pub async fn run(pool: &PgPool) {
    match transaction_store::list_non_terminal(pool).await {
        Ok(rows) => {
            for (log, _version) in &rows {
                tracing::warn!(
                    transaction_id = %log.id,
                    order_id = %log.order_id,
                    status = ?log.status,
                    "non-terminal transaction found at startup; leaving it to the sweeper"
                );
            }
            tracing::info!(count = rows.len(), "startup recovery pass complete");
        }
        Err(err) => tracing::error!(%err, "startup recovery pass failed to list non-terminal transactions"),
    }
}
