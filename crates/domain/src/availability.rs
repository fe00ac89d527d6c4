//! Per-(resource unit, date) availability, the unit of contention both
//! protocols serialize on (spec §4.2 `AvailabilityRecord`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::resource::ResourceKind;

/// One row of inventory: is `unit_id` free on `date`, and if not, who holds
/// it.
///
/// Train has no date dimension (spec §2), so train participants use a
/// constant sentinel date (`ResourceKind::Train` rows always carry
/// `NaiveDate::MIN`) and treat the record as a plain per-seat flag. Hotel and
/// car participants store one row per date in the requested range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub kind: ResourceKind,
    pub unit_id: String,
    pub date: NaiveDate,
    pub held_by: Option<String>,
}

impl AvailabilityRecord {
    pub fn free(kind: ResourceKind, unit_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            kind,
            unit_id: unit_id.into(),
            date,
            held_by: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.held_by.is_none()
    }

    pub fn is_held_by(&self, order_id: &str) -> bool {
        self.held_by.as_deref() == Some(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_is_free() {
        let rec = AvailabilityRecord::free(ResourceKind::Hotel, "room-1", NaiveDate::MIN);
        assert!(rec.is_free());
        assert!(!rec.is_held_by("order-1"));
    }

    #[test]
    fn held_record_reports_holder() {
        let mut rec = AvailabilityRecord::free(ResourceKind::Car, "car-1", NaiveDate::MIN);
        rec.held_by = Some("order-9".to_string());
        assert!(!rec.is_free());
        assert!(rec.is_held_by("order-9"));
        assert!(!rec.is_held_by("order-1"));
    }
}
