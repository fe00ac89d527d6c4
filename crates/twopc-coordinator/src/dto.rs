//! Wire shapes for the coordinator's client-facing HTTP surface (spec §6.1
//! "2PC coordinator"): same body shape as the saga order service.

use serde::{Deserialize, Serialize};

use booking_core::{BookingError, OrderId, TransactionId};
use booking_domain::date_range::{parse_ddmmyyyy, DateRange};
use booking_domain::request::ResourceSelection;
use booking_domain::twopc::{TransactionLog, TxStatus};
use booking_domain::{BookingRequest, ResourceKind};

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub hotel_room_id: String,
    pub hotel_room_start_date: String,
    pub hotel_room_end_date: String,
    pub car_id: String,
    pub car_start_date: String,
    pub car_end_date: String,
    pub train_seat_id: String,
    pub user_id: String,
}

impl CreateOrderRequest {
    pub fn into_domain(self) -> Result<BookingRequest, BookingError> {
        let hotel_range = DateRange::new(
            parse_ddmmyyyy(&self.hotel_room_start_date)?,
            parse_ddmmyyyy(&self.hotel_room_end_date)?,
        )?;
        let car_range = DateRange::new(parse_ddmmyyyy(&self.car_start_date)?, parse_ddmmyyyy(&self.car_end_date)?)?;

        Ok(BookingRequest {
            customer_id: self.user_id,
            selections: vec![
                ResourceSelection {
                    kind: ResourceKind::Hotel,
                    unit_id: self.hotel_room_id,
                    range: Some(hotel_range),
                },
                ResourceSelection {
                    kind: ResourceKind::Car,
                    unit_id: self.car_id,
                    range: Some(car_range),
                },
                ResourceSelection {
                    kind: ResourceKind::Train,
                    unit_id: self.train_seat_id,
                    range: None,
                },
            ],
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub order_id: String,
    pub transaction_id: String,
    pub status: String,
    pub message: String,
}

impl AcceptedResponse {
    pub fn new(order_id: OrderId, transaction_id: TransactionId) -> Self {
        Self {
            order_id: order_id.to_string(),
            transaction_id: transaction_id.to_string(),
            status: "initiated".to_string(),
            message: "transaction accepted; prepare/commit run asynchronously".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParticipantStatusDto {
    pub kind: String,
    pub status: String,
    pub error: Option<String>,
    pub retry_count: u32,
    pub done_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
pub struct TransactionStatusResponse {
    pub id: String,
    pub order_id: String,
    pub status: String,
    pub participants: Vec<ParticipantStatusDto>,
    pub failure_reason: Option<String>,
    pub commit_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&TransactionLog> for TransactionStatusResponse {
    fn from(log: &TransactionLog) -> Self {
        let status = match log.status {
            TxStatus::Initiated => "initiated",
            TxStatus::Prepared => "prepared",
            TxStatus::Committed => "committed",
            TxStatus::Aborted => "aborted",
            TxStatus::RolledBack => "rolled-back",
            TxStatus::TimedOut => "timed-out",
        };
        Self {
            id: log.id.to_string(),
            order_id: log.order_id.to_string(),
            status: status.to_string(),
            participants: log
                .participants
                .iter()
                .map(|p| ParticipantStatusDto {
                    kind: p.kind.to_string(),
                    status: format!("{:?}", p.status).to_lowercase(),
                    error: p.error.clone(),
                    retry_count: p.retry_count,
                    done_at: p.done_at,
                })
                .collect(),
            failure_reason: log.failure_reason.clone(),
            commit_timestamp: log.commit_timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> TransactionLog {
        let endpoints = vec![
            (ResourceKind::Hotel, "http://hotel".to_string()),
            (ResourceKind::Car, "http://car".to_string()),
            (ResourceKind::Train, "http://train".to_string()),
        ];
        TransactionLog::new(OrderId::new(), &endpoints, chrono::Utc::now(), 3)
    }

    #[test]
    fn status_response_reports_initiated_and_pending_participants() {
        let log = log();
        let response = TransactionStatusResponse::from(&log);
        assert_eq!(response.status, "initiated");
        assert_eq!(response.participants.len(), 3);
        assert!(response.participants.iter().all(|p| p.status == "pending"));
        assert!(response.failure_reason.is_none());
    }

    #[test]
    fn create_order_request_rejects_invalid_dates() {
        let body = CreateOrderRequest {
            hotel_room_id: "room-1".to_string(),
            hotel_room_start_date: "not-a-date".to_string(),
            hotel_room_end_date: "2026-01-02".to_string(),
            car_id: "car-1".to_string(),
            car_start_date: "2026-01-01".to_string(),
            car_end_date: "2026-01-02".to_string(),
            train_seat_id: "seat-1".to_string(),
            user_id: "user-1".to_string(),
        };
        assert!(body.into_domain().is_err());
    }

    #[test]
    fn create_order_request_builds_three_selections() {
        let body = CreateOrderRequest {
            hotel_room_id: "room-1".to_string(),
            hotel_room_start_date: "01-01-2026".to_string(),
            hotel_room_end_date: "03-01-2026".to_string(),
            car_id: "car-1".to_string(),
            car_start_date: "01-01-2026".to_string(),
            car_end_date: "02-01-2026".to_string(),
            train_seat_id: "seat-1".to_string(),
            user_id: "user-1".to_string(),
        };
        let request = body.into_domain().unwrap();
        assert_eq!(request.selections.len(), 3);
    }
}
