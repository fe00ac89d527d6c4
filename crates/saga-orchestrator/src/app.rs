//! HTTP entrypoint (spec §6.1 saga order service).

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::dto::{CreateOrderRequest, OrderResponse};
use crate::errors::booking_error_response;
use crate::orchestrator::Orchestrator;

pub fn build_app(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/orders", post(create_order))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(Extension(orchestrator)))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_order(
    Extension(orchestrator): Extension<Arc<Orchestrator>>,
    Json(body): Json<CreateOrderRequest>,
) -> axum::response::Response {
    let (user_id, request) = match body.into_domain() {
        Ok(parsed) => parsed,
        Err(err) => return booking_error_response(err),
    };

    match orchestrator.start_saga(user_id, request).await {
        Ok(order) => (StatusCode::OK, Json(OrderResponse::from(&order))).into_response(),
        Err(err) => booking_error_response(err),
    }
}
