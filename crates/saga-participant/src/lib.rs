//! A generic saga participant: reserve-on-command, cancel-on-command, reply
//! with the matching `*.reserved` / `*.failed` event (spec §4.2, §6.2).
//!
//! `hotel`, `car`, and `train` are the same handler compiled into three
//! binaries with a fixed `ResourceKind`, the way the teacher's worker
//! binaries share one generic job-runner parameterized by job type.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use booking_domain::ResourceKind;

pub mod config;
pub mod handler;

pub use config::Config;
pub use handler::run;

/// Shared binary entrypoint for the three per-domain processes.
pub async fn run_main(kind: ResourceKind, config: Config) {
    booking_observability::init();

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

    let shutdown = CancellationToken::new();
    let task = tokio::spawn(handler::run(pool, bus, kind, shutdown.clone()));

    tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(30), task).await;
}
