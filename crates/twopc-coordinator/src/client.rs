//! HTTP calls to the three 2PC participants, with retry/backoff (spec §4.3
//! "Retry with backoff").

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use booking_core::{BookingError, TransactionId};

use crate::retry;

#[derive(Debug, Deserialize)]
struct Outcome {
    success: bool,
    message: String,
}

/// Outcome of one call attempt, distinguishing a definitive participant
/// vote (`Vote`) from a transport failure the caller should retry.
pub enum CallResult {
    Vote { success: bool, message: String },
    TransportError(String),
}

pub struct ParticipantClient {
    http: reqwest::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl ParticipantClient {
    pub fn new(call_timeout: Duration, max_retries: u32) -> Result<Self, BookingError> {
        let http = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .map_err(|e| BookingError::internal(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            max_retries,
            base_delay: Duration::from_millis(200),
        })
    }

    async fn post(&self, url: &str, body: &JsonValue) -> CallResult {
        match self.http.post(url).json(body).send().await {
            Ok(response) if response.status().is_success() => match response.json::<Outcome>().await {
                Ok(outcome) => CallResult::Vote { success: outcome.success, message: outcome.message },
                Err(err) => CallResult::TransportError(format!("malformed participant response: {err}")),
            },
            Ok(response) if response.status().is_client_error() => match response.json::<Outcome>().await {
                // A 400 with a well-formed body is a definitive vote-abort,
                // not a transport failure (spec §4.3: "a definitive
                // success=false ... is NOT retried").
                Ok(outcome) => CallResult::Vote { success: outcome.success, message: outcome.message },
                Err(_) => CallResult::TransportError(format!("http {}", response.status())),
            },
            Ok(response) => CallResult::TransportError(format!("http {}", response.status())),
            Err(err) => CallResult::TransportError(err.to_string()),
        }
    }

    /// Send Prepare, retrying transport failures up to `max_retries` times
    /// with exponential backoff. A definitive vote (success true or false)
    /// returns immediately without retrying (spec §4.3).
    pub async fn prepare(
        &self,
        endpoint: &str,
        transaction_id: TransactionId,
        order_id: &str,
        payload: JsonValue,
    ) -> (bool, String, u32) {
        self.call_with_retry(
            &format!("{endpoint}/twophase/prepare"),
            serde_json::json!({
                "transaction_id": transaction_id.to_string(),
                "order_id": order_id,
                "payload": payload,
            }),
        )
        .await
    }

    pub async fn commit(&self, endpoint: &str, transaction_id: TransactionId) -> (bool, String, u32) {
        self.call_with_retry(
            &format!("{endpoint}/twophase/commit"),
            serde_json::json!({ "transaction_id": transaction_id.to_string() }),
        )
        .await
    }

    /// Best-effort Abort: a single attempt, no retry (spec §4.3: "Abort
    /// calls are best-effort (no retry) ... the sweeper will reattempt
    /// later").
    pub async fn abort(&self, endpoint: &str, transaction_id: TransactionId) {
        let _ = self
            .post(
                &format!("{endpoint}/twophase/abort"),
                &serde_json::json!({ "transaction_id": transaction_id.to_string() }),
            )
            .await;
    }

    /// Returns `(success, message, retry_count)`.
    async fn call_with_retry(&self, url: &str, body: JsonValue) -> (bool, String, u32) {
        let mut attempt = 0;
        loop {
            match self.post(url, &body).await {
                CallResult::Vote { success, message } => return (success, message, attempt),
                CallResult::TransportError(err) => {
                    if attempt >= self.max_retries {
                        return (false, format!("transport error after {attempt} retries: {err}"), attempt);
                    }
                    tokio::time::sleep(retry::delay_for_attempt(self.base_delay, attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
