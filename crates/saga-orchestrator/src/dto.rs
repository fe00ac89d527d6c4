//! Wire shape for `POST /orders` (spec §6.1: saga order service).

use serde::{Deserialize, Serialize};

use booking_core::BookingError;
use booking_domain::date_range::{parse_ddmmyyyy, DateRange};
use booking_domain::request::ResourceSelection;
use booking_domain::saga::Order;
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
    pub fn into_domain(self) -> Result<(String, BookingRequest), BookingError> {
        let hotel_range = DateRange::new(
            parse_ddmmyyyy(&self.hotel_room_start_date)?,
            parse_ddmmyyyy(&self.hotel_room_end_date)?,
        )?;
        let car_range = DateRange::new(
            parse_ddmmyyyy(&self.car_start_date)?,
            parse_ddmmyyyy(&self.car_end_date)?,
        )?;

        let request = BookingRequest {
            customer_id: self.user_id.clone(),
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
        };
        Ok((self.user_id, request))
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        let status = match order.status {
            booking_domain::saga::OrderStatus::Pending => "pending",
            booking_domain::saga::OrderStatus::AwaitingConfirmation => "awaiting-confirmation",
            booking_domain::saga::OrderStatus::Booked => "booked",
            booking_domain::saga::OrderStatus::Failed => "failed",
        };
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.clone(),
            status: status.to_string(),
        }
    }
}
