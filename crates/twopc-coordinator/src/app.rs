//! HTTP entrypoint (spec §6.1 "2PC coordinator").

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use booking_core::TransactionId;
use booking_store::twopc::transaction_store;

use crate::coordinator::Coordinator;
use crate::dto::{AcceptedResponse, CreateOrderRequest, TransactionStatusResponse};
use crate::errors::booking_error_response;

pub fn build_app(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/orders", post(create_order))
        .route("/transactions/:id", get(get_transaction))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(Extension(coordinator)))
}

async fn health() -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "timestamp": Utc::now(), "service": "twopc-coordinator" })),
    )
        .into_response()
}

async fn create_order(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(body): Json<CreateOrderRequest>,
) -> axum::response::Response {
    let request = match body.into_domain() {
        Ok(request) => request,
        Err(err) => return booking_error_response(err),
    };

    match coordinator.initiate(request).await {
        Ok((order_id, transaction_id)) => {
            (StatusCode::ACCEPTED, Json(AcceptedResponse::new(order_id, transaction_id))).into_response()
        }
        Err(err) => booking_error_response(err),
    }
}

async fn get_transaction(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let transaction_id: TransactionId = match id.parse() {
        Ok(id) => id,
        Err(err) => return booking_error_response(err),
    };

    match transaction_store::load(coordinator.pool(), transaction_id).await {
        Ok((log, _version)) => (StatusCode::OK, Json(TransactionStatusResponse::from(&log))).into_response(),
        Err(err) => booking_error_response(err),
    }
}
