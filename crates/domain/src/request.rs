//! The client-facing booking request, shared by the saga and 2PC entrypoints
//! (spec §4.1 `ClientOrder`, §6.1 request bodies).

use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::resource::ResourceKind;

/// One leg of a booking request: a resource kind, the unit wanted, and (for
/// hotel/car) the date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSelection {
    pub kind: ResourceKind,
    pub unit_id: String,
    pub range: Option<DateRange>,
}

impl ResourceSelection {
    /// A selection is well-formed when the date range is present exactly
    /// when the resource kind has a date dimension (spec §5, hotel/car
    /// invariant).
    pub fn validate(&self) -> Result<(), booking_core::BookingError> {
        let has_range = self.range.is_some();
        if has_range != self.kind.has_date_range() {
            return Err(booking_core::BookingError::validation(format!(
                "{} selection {} a date range but {}",
                self.kind,
                if has_range { "carries" } else { "is missing" },
                if self.kind.has_date_range() {
                    "requires one"
                } else {
                    "does not take one"
                },
            )));
        }
        Ok(())
    }
}

/// A full booking request: one selection per resource the client wants,
/// all-or-nothing across hotel, car, and train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub customer_id: String,
    pub selections: Vec<ResourceSelection>,
}

impl BookingRequest {
    /// All-or-nothing: exactly one selection per `ResourceKind`, no missing
    /// and no duplicate (spec §1, §2, §4.1 `ClientOrder`).
    pub fn validate(&self) -> Result<(), booking_core::BookingError> {
        if self.selections.is_empty() {
            return Err(booking_core::BookingError::validation(
                "booking request must select at least one resource",
            ));
        }
        for selection in &self.selections {
            selection.validate()?;
        }
        for kind in ResourceKind::all() {
            let count = self.selections.iter().filter(|s| s.kind == kind).count();
            match count {
                1 => {}
                0 => {
                    return Err(booking_core::BookingError::validation(format!(
                        "booking request is missing a {kind} selection"
                    )))
                }
                _ => {
                    return Err(booking_core::BookingError::validation(format!(
                        "booking request has {count} {kind} selections, want exactly one"
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn selection(&self, kind: ResourceKind) -> Option<&ResourceSelection> {
        self.selections.iter().find(|s| s.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        let d = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        DateRange::new(d, d).unwrap()
    }

    #[test]
    fn hotel_selection_without_range_is_rejected() {
        let sel = ResourceSelection {
            kind: ResourceKind::Hotel,
            unit_id: "room-1".into(),
            range: None,
        };
        assert!(sel.validate().is_err());
    }

    #[test]
    fn train_selection_with_range_is_rejected() {
        let sel = ResourceSelection {
            kind: ResourceKind::Train,
            unit_id: "seat-1".into(),
            range: Some(range()),
        };
        assert!(sel.validate().is_err());
    }

    #[test]
    fn empty_request_is_rejected() {
        let req = BookingRequest {
            customer_id: "cust-1".into(),
            selections: vec![],
        };
        assert!(req.validate().is_err());
    }

    fn full_request() -> BookingRequest {
        BookingRequest {
            customer_id: "cust-1".into(),
            selections: vec![
                ResourceSelection {
                    kind: ResourceKind::Hotel,
                    unit_id: "room-1".into(),
                    range: Some(range()),
                },
                ResourceSelection {
                    kind: ResourceKind::Car,
                    unit_id: "car-1".into(),
                    range: Some(range()),
                },
                ResourceSelection {
                    kind: ResourceKind::Train,
                    unit_id: "seat-1".into(),
                    range: None,
                },
            ],
        }
    }

    #[test]
    fn well_formed_request_passes_and_is_looked_up_by_kind() {
        let req = full_request();
        assert!(req.validate().is_ok());
        assert!(req.selection(ResourceKind::Train).is_some());
        assert!(req.selection(ResourceKind::Car).is_some());
    }

    #[test]
    fn missing_a_resource_kind_is_rejected() {
        let mut req = full_request();
        req.selections.retain(|s| s.kind != ResourceKind::Train);
        assert!(req.validate().is_err());
    }

    #[test]
    fn duplicate_resource_kind_is_rejected() {
        let mut req = full_request();
        let hotel = req.selections[0].clone();
        req.selections.push(hotel);
        assert!(req.validate().is_err());
    }
}
