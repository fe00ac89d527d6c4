//! A generic 2PC participant: Prepare/Commit/Abort HTTP handlers for one
//! resource domain (spec §4.4), parameterized by `ResourceKind` the same
//! way `booking-saga-participant` parameterizes its bus handlers.

use std::sync::Arc;

use sqlx::PgPool;

use booking_domain::ResourceKind;

pub mod app;
pub mod config;
pub mod dto;
pub mod errors;

pub use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub kind: ResourceKind,
}

/// Shared binary entrypoint for the three per-domain processes.
pub async fn run_main(kind: ResourceKind, config: Config) {
    booking_observability::init();

    let pool = booking_store::connect(&config.database_url, 10)
        .await
        .expect("failed to connect to database");

    let state = Arc::new(AppState { pool, kind });
    let app = app::build_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind http listener");
    tracing::info!(addr = %listener.local_addr().unwrap(), %kind, "2pc participant listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
        })
        .await
        .expect("http server error");
}
