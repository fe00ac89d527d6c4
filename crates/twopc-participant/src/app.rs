//! HTTP entrypoint (spec §6.1 "2PC participant").

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use booking_core::BookingError;
use booking_store::twopc::inventory;

use crate::dto::{AbortRequest, CommitRequest, Outcome, PrepareRequest};
use crate::errors::outcome_response;
use crate::AppState;

pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/twophase/prepare", post(prepare))
        .route("/twophase/commit", post(commit))
        .route("/twophase/abort", post(abort))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn prepare(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PrepareRequest>,
) -> (StatusCode, Json<Outcome>) {
    let result: Result<Outcome, BookingError> = async {
        let transaction_id = body.transaction_id()?;
        let (unit_id, range) = body.selection(state.kind)?;
        let log = inventory::prepare(&state.pool, transaction_id, state.kind, &unit_id, range).await?;
        Ok(Outcome::ok(format!("{:?}", log.status).to_lowercase()))
    }
    .await;

    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)),
        Err(err) => outcome_response(err),
    }
}

async fn commit(State(state): State<Arc<AppState>>, Json(body): Json<CommitRequest>) -> (StatusCode, Json<Outcome>) {
    let result: Result<Outcome, BookingError> = async {
        let transaction_id = body.transaction_id()?;
        let log = inventory::commit(&state.pool, transaction_id).await?;
        Ok(Outcome::ok(format!("{:?}", log.status).to_lowercase()))
    }
    .await;

    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)),
        Err(err) => outcome_response(err),
    }
}

async fn abort(State(state): State<Arc<AppState>>, Json(body): Json<AbortRequest>) -> (StatusCode, Json<Outcome>) {
    let result: Result<Outcome, BookingError> = async {
        let transaction_id = body.transaction_id()?;
        match inventory::abort(&state.pool, transaction_id).await? {
            Some(log) => Ok(Outcome::ok(format!("{:?}", log.status).to_lowercase())),
            None => Ok(Outcome::ok("unknown transaction, no-op")),
        }
    }
    .await;

    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)),
        Err(err) => outcome_response(err),
    }
}
