//! Environment-variable configuration (spec §5 "Timeouts", §6.4).

use std::time::Duration;

use booking_domain::ResourceKind;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Base URL of each participant's `/twophase` API, fixed iteration order
    /// {hotel, car, train} (spec §5 "2PC participants are called in a fixed
    /// total order").
    pub participant_endpoints: Vec<(ResourceKind, String)>,
    pub transaction_timeout: Duration,
    pub max_retries: u32,
    pub http_call_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let endpoint = |kind: ResourceKind, var: &str, default: &str| {
            (kind, std::env::var(var).unwrap_or_else(|_| default.to_string()))
        };

        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/booking".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8082),
            participant_endpoints: vec![
                endpoint(ResourceKind::Hotel, "HOTEL_PARTICIPANT_URL", "http://localhost:9001"),
                endpoint(ResourceKind::Car, "CAR_PARTICIPANT_URL", "http://localhost:9002"),
                endpoint(ResourceKind::Train, "TRAIN_PARTICIPANT_URL", "http://localhost:9003"),
            ],
            transaction_timeout: Duration::from_secs(
                std::env::var("TRANSACTION_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(30),
            ),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(3),
            http_call_timeout: Duration::from_secs(
                std::env::var("HTTP_CALL_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(10),
            ),
            sweep_interval: Duration::from_secs(
                std::env::var("SWEEP_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(60),
            ),
        }
    }
}
