use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

mod app;
mod config;
mod consumer;
mod dto;
mod errors;
mod orchestrator;

use config::Config;
use orchestrator::Orchestrator;

#[tokio::main]
async fn main() {
    booking_observability::init();

    let config = Config::from_env();
    let pool = booking_store::connect(&config.database_url, 10)
        .await
        .expect("failed to connect to database");

    let bus: Arc<dyn booking_messaging::EventBus> = match &config.rabbitmq_url {
        Some(url) => Arc::new(
            booking_messaging::AmqpBus::connect(url)
                .await
                .expect("failed to connect to rabbitmq"),
        ),
        None => {
            tracing::warn!("RABBITMQ_URL not set; using in-memory bus (development only)");
            Arc::new(booking_messaging::InMemoryBus::new())
        }
    };

    let orchestrator = Arc::new(Orchestrator::new(pool, bus.clone()));

    let shutdown = CancellationToken::new();
    let consumer_handle = consumer::spawn(bus, orchestrator.clone(), shutdown.clone());

    let app = app::build_app(orchestrator);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind http listener");
    tracing::info!(addr = %listener.local_addr().unwrap(), "saga orchestrator listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown.clone()));

    if let Err(err) = server.await {
        tracing::error!(%err, "http server exited with error");
    }

    shutdown.cancel();
    // Bounded drain window (spec §5 "outstanding store operations are given
    // a 30-second drain window").
    let _ = tokio::time::timeout(Duration::from_secs(30), consumer_handle).await;
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = shutdown.cancelled() => {}
    }
}
