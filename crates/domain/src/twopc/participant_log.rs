//! The 2PC participant's local log row (spec §3.4 "Participant-side log").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use booking_core::{BookingError, ReservationId, TransactionId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantLogStatus {
    Prepared,
    Committed,
    Aborted,
}

/// One transaction's state at a single participant (spec §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantLog {
    pub transaction_id: TransactionId,
    pub status: ParticipantLogStatus,
    pub reservation_id: ReservationId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ParticipantLog {
    pub fn new_prepared(transaction_id: TransactionId, reservation_id: ReservationId, now: DateTime<Utc>) -> Self {
        Self {
            transaction_id,
            status: ParticipantLogStatus::Prepared,
            reservation_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Commit is a no-op once already `committed` or `aborted` (spec §4.4
    /// Commit: "If already `committed` or `aborted`, no-op and return
    /// success").
    pub fn commit(&mut self, now: DateTime<Utc>) -> Result<(), BookingError> {
        match self.status {
            ParticipantLogStatus::Prepared => {
                self.status = ParticipantLogStatus::Committed;
                self.updated_at = now;
                Ok(())
            }
            ParticipantLogStatus::Committed | ParticipantLogStatus::Aborted => Ok(()),
        }
    }

    /// Abort is a no-op unless the row is `prepared` (spec §4.4 Abort: "if
    /// log row is not `prepared`, no-op").
    pub fn abort(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != ParticipantLogStatus::Prepared {
            return false;
        }
        self.status = ParticipantLogStatus::Aborted;
        self.updated_at = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn commit_from_prepared_succeeds() {
        let mut log = ParticipantLog::new_prepared(TransactionId::new(), ReservationId::new(), now());
        log.commit(now()).unwrap();
        assert_eq!(log.status, ParticipantLogStatus::Committed);
    }

    #[test]
    fn duplicate_commit_is_a_no_op() {
        let mut log = ParticipantLog::new_prepared(TransactionId::new(), ReservationId::new(), now());
        log.commit(now()).unwrap();
        log.commit(now()).unwrap();
        assert_eq!(log.status, ParticipantLogStatus::Committed);
    }

    #[test]
    fn abort_after_commit_is_a_no_op_and_reports_no_change() {
        let mut log = ParticipantLog::new_prepared(TransactionId::new(), ReservationId::new(), now());
        log.commit(now()).unwrap();
        let changed = log.abort(now());
        assert!(!changed);
        assert_eq!(log.status, ParticipantLogStatus::Committed);
    }

    #[test]
    fn abort_from_prepared_succeeds_and_reports_change() {
        let mut log = ParticipantLog::new_prepared(TransactionId::new(), ReservationId::new(), now());
        let changed = log.abort(now());
        assert!(changed);
        assert_eq!(log.status, ParticipantLogStatus::Aborted);
    }
}
