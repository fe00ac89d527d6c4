//! Environment-variable configuration, one participant process per resource
//! kind (spec §6.4).

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rabbitmq_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/booking".to_string()),
            rabbitmq_url: std::env::var("RABBITMQ_URL").ok(),
        }
    }
}
