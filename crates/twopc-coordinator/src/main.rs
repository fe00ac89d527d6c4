use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

mod app;
mod client;
mod config;
mod coordinator;
mod dto;
mod errors;
mod recovery;
mod retry;
mod sweeper;

use config::Config;
use coordinator::Coordinator;

#[tokio::main]
async fn main() {
    booking_observability::init();

    let config = Config::from_env();
    let pool = booking_store::connect(&config.database_url, 10)
        .await
        .expect("failed to connect to database");

    recovery::run(&pool).await;

    let client = Arc::new(
        client::ParticipantClient::new(config.http_call_timeout, config.max_retries)
            .expect("failed to build participant http client"),
    );
    let coordinator = Arc::new(Coordinator::new(
        pool,
        client,
        config.participant_endpoints.clone(),
        config.max_retries,
        config.transaction_timeout,
    ));

    let shutdown = CancellationToken::new();
    let sweeper_handle = sweeper::spawn(coordinator.clone(), config.sweep_interval, shutdown.clone());

    let app = app::build_app(coordinator);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind http listener");
    tracing::info!(addr = %listener.local_addr().unwrap(), "2pc coordinator listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown.clone()));

    if let Err(err) = server.await {
        tracing::error!(%err, "http server exited with error");
    }

    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(30), sweeper_handle).await;
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = shutdown.cancelled() => {}
    }
}
