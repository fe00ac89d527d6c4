//! Maps store/validation failures to the `{success: false, message}` shape
//! every 2PC participant endpoint returns (spec §6.1: "200 when success,
//! 400 otherwise").

use axum::http::StatusCode;
use axum::Json;

use booking_core::BookingError;

use crate::dto::Outcome;

pub fn outcome_response(err: BookingError) -> (StatusCode, Json<Outcome>) {
    (StatusCode::BAD_REQUEST, Json(Outcome::failed(err.to_string())))
}
