//! Timeout sweeper: periodically abort transactions past their deadline
//! (spec §4.3 "Timeout sweeper").

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use booking_store::twopc::transaction_store;

use crate::coordinator::Coordinator;

/// Spawn the sweeper loop. Idempotent: a log swept into `timed-out` has a
/// terminal status and will not be selected again (spec §4.3).
pub fn spawn(coordinator: Arc<Coordinator>, interval: Duration, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("timeout sweeper shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    sweep_once(&coordinator).await;
                }
            }
        }
    })
}

async fn sweep_once(coordinator: &Coordinator) {
    let timed_out = match transaction_store::list_timed_out(coordinator.pool(), Utc::now()).await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::error!(%err, "sweeper failed to list timed-out transactions");
            return;
        }
    };

    for (mut log, version) in timed_out {
        tracing::warn!(transaction_id = %log.id, "sweeping timed-out transaction");
        coordinator.abort_for_timeout(&mut log, version).await;
    }
}
