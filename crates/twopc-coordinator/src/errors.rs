//! Maps `BookingError` to the HTTP surface (spec §7).

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use booking_core::BookingError;

pub fn booking_error_response(err: BookingError) -> axum::response::Response {
    let status = match &err {
        BookingError::Validation(_) | BookingError::InvalidId(_) => StatusCode::BAD_REQUEST,
        BookingError::NotFound => StatusCode::NOT_FOUND,
        BookingError::NotAvailable(_) | BookingError::Conflict(_) => StatusCode::CONFLICT,
        BookingError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        BookingError::Transport(_) | BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, axum::Json(json!({ "error": err.to_string() }))).into_response()
}
