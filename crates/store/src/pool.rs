//! Connection pool setup, shared by every binary in the workspace.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use booking_core::BookingError;

/// Connect a bounded pool. `max_connections` should stay small per binary —
/// each participant, the orchestrator, and the coordinator all run in their
/// own process with their own pool (spec §5 "shared mutable state": the
/// store client is established once at startup and treated as read-only
/// thereafter).
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, BookingError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(BookingError::from)
}
