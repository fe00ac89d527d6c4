//! Map `BookingError` to the HTTP surface (spec §7 "Validation is a 4xx to
//! the client before any side effect").

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
    json_error(status, err.to_string())
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}
