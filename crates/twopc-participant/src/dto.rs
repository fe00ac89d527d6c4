//! HTTP request/response bodies (spec §6.1 "2PC participant").

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use booking_core::{BookingError, TransactionId};
use booking_domain::{DateRange, ResourceKind};

#[derive(Debug, Deserialize)]
pub struct PrepareRequest {
    pub transaction_id: String,
    #[allow(dead_code)] // carried for parity with the wire shape; participants key state on transaction_id alone
    pub order_id: String,
    pub payload: JsonValue,
}

impl PrepareRequest {
    pub fn transaction_id(&self) -> Result<TransactionId, BookingError> {
        self.transaction_id
            .parse()
            .map_err(|_| BookingError::validation(format!("invalid transaction_id: {}", self.transaction_id)))
    }

    /// Parse `(unit_id, date_range)` from `payload` for `kind` (spec §6.1
    /// payload shapes, `YYYY-MM-DD` dates).
    pub fn selection(&self, kind: ResourceKind) -> Result<(String, Option<DateRange>), BookingError> {
        let unit_field = match kind {
            ResourceKind::Hotel => "hotel_room_id",
            ResourceKind::Car => "car_id",
            ResourceKind::Train => "train_seat_id",
        };
        let unit_id = self
            .payload
            .get(unit_field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| BookingError::validation(format!("prepare payload missing {unit_field}")))?
            .to_string();

        if !kind.has_date_range() {
            return Ok((unit_id, None));
        }

        let (start_field, end_field) = match kind {
            ResourceKind::Hotel => ("hotel_room_start_date", "hotel_room_end_date"),
            ResourceKind::Car => ("car_start_date", "car_end_date"),
            ResourceKind::Train => unreachable!("train has no date range"),
        };
        let start = self
            .payload
            .get(start_field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| BookingError::validation(format!("prepare payload missing {start_field}")))?;
        let end = self
            .payload
            .get(end_field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| BookingError::validation(format!("prepare payload missing {end_field}")))?;
        let range = DateRange::new(
            booking_domain::date_range::parse_iso(start)?,
            booking_domain::date_range::parse_iso(end)?,
        )?;
        Ok((unit_id, Some(range)))
    }
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub transaction_id: String,
}

impl CommitRequest {
    pub fn transaction_id(&self) -> Result<TransactionId, BookingError> {
        self.transaction_id
            .parse()
            .map_err(|_| BookingError::validation(format!("invalid transaction_id: {}", self.transaction_id)))
    }
}

#[derive(Debug, Deserialize)]
pub struct AbortRequest {
    pub transaction_id: String,
}

impl AbortRequest {
    pub fn transaction_id(&self) -> Result<TransactionId, BookingError> {
        self.transaction_id
            .parse()
            .map_err(|_| BookingError::validation(format!("invalid transaction_id: {}", self.transaction_id)))
    }
}

#[derive(Debug, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_hotel_selection_with_date_range() {
        let req = PrepareRequest {
            transaction_id: uuid::Uuid::now_v7().to_string(),
            order_id: "order-1".to_string(),
            payload: json!({
                "hotel_room_id": "room-9",
                "hotel_room_start_date": "2026-02-01",
                "hotel_room_end_date": "2026-02-03",
            }),
        };
        let (unit_id, range) = req.selection(ResourceKind::Hotel).unwrap();
        assert_eq!(unit_id, "room-9");
        assert!(range.is_some());
    }

    #[test]
    fn parses_train_selection_without_date_range() {
        let req = PrepareRequest {
            transaction_id: uuid::Uuid::now_v7().to_string(),
            order_id: "order-1".to_string(),
            payload: json!({ "train_seat_id": "seat-4" }),
        };
        let (unit_id, range) = req.selection(ResourceKind::Train).unwrap();
        assert_eq!(unit_id, "seat-4");
        assert!(range.is_none());
    }

    #[test]
    fn missing_unit_field_is_rejected() {
        let req = PrepareRequest {
            transaction_id: uuid::Uuid::now_v7().to_string(),
            order_id: "order-1".to_string(),
            payload: json!({}),
        };
        assert!(req.selection(ResourceKind::Car).is_err());
    }

    #[test]
    fn rejects_malformed_transaction_id() {
        let req = CommitRequest {
            transaction_id: "not-a-uuid".to_string(),
        };
        assert!(req.transaction_id().is_err());
    }
}
