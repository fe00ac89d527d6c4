//! The 2PC coordinator's `TransactionLog` (spec §3.1, §3.4, §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use booking_core::{BookingError, OrderId, TransactionId};

use crate::resource::ResourceKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TxStatus {
    Initiated,
    Prepared,
    Committed,
    Aborted,
    RolledBack,
    TimedOut,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TxStatus::Committed | TxStatus::Aborted | TxStatus::RolledBack | TxStatus::TimedOut
        )
    }

    /// Statuses the sweeper considers still-in-flight (spec §4.3 timeout
    /// sweeper: "status in {initiated, prepared}").
    pub fn is_sweepable(&self) -> bool {
        matches!(self, TxStatus::Initiated | TxStatus::Prepared)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantVote {
    Pending,
    Prepared,
    Committed,
    Failed,
}

/// One row of `TransactionLog.participants` (spec §3.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRow {
    pub kind: ResourceKind,
    pub endpoint: String,
    pub status: ParticipantVote,
    pub error: Option<String>,
    pub retry_count: u32,
    pub done_at: Option<DateTime<Utc>>,
}

impl ParticipantRow {
    fn pending(kind: ResourceKind, endpoint: impl Into<String>) -> Self {
        Self {
            kind,
            endpoint: endpoint.into(),
            status: ParticipantVote::Pending,
            error: None,
            retry_count: 0,
            done_at: None,
        }
    }
}

/// The coordinator's durable, authoritative record of one transaction's
/// protocol state (spec §3.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLog {
    pub id: TransactionId,
    pub order_id: OrderId,
    pub status: TxStatus,
    /// Fixed order {hotel, car, train} (spec §5 ordering guarantees).
    pub participants: Vec<ParticipantRow>,
    pub timeout_at: DateTime<Utc>,
    pub max_retries: u32,
    pub failure_reason: Option<String>,
    pub done_at: Option<DateTime<Utc>>,
    pub commit_timestamp: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version (spec §5, §9: "the `Version` field
    /// visible in one model variant hints at this").
    pub version: i64,
}

impl TransactionLog {
    pub fn new(
        order_id: OrderId,
        endpoints: &[(ResourceKind, String)],
        timeout_at: DateTime<Utc>,
        max_retries: u32,
    ) -> Self {
        let participants = endpoints
            .iter()
            .map(|(kind, endpoint)| ParticipantRow::pending(*kind, endpoint.clone()))
            .collect();
        Self {
            id: TransactionId::new(),
            order_id,
            status: TxStatus::Initiated,
            participants,
            timeout_at,
            max_retries,
            failure_reason: None,
            done_at: None,
            commit_timestamp: None,
            version: 0,
        }
    }

    fn row_mut(&mut self, kind: ResourceKind) -> &mut ParticipantRow {
        self.participants
            .iter_mut()
            .find(|p| p.kind == kind)
            .expect("every resource kind has a seeded participant row")
    }

    pub fn row(&self, kind: ResourceKind) -> &ParticipantRow {
        self.participants
            .iter()
            .find(|p| p.kind == kind)
            .expect("every resource kind has a seeded participant row")
    }

    /// Start of the prepare phase: "Update log status to prepared" happens
    /// before any participant call is sent (spec §4.3 step 2) — `Prepared`
    /// here means "prepare phase underway", not "all participants voted".
    pub fn start_prepare_phase(&mut self, now: DateTime<Utc>) -> Result<(), BookingError> {
        if self.status != TxStatus::Initiated {
            return Err(BookingError::internal(format!(
                "transaction {} cannot start prepare from {:?}",
                self.id, self.status
            )));
        }
        self.status = TxStatus::Prepared;
        self.touch(now);
        Ok(())
    }

    pub fn record_prepare_success(&mut self, kind: ResourceKind, now: DateTime<Utc>) {
        let row = self.row_mut(kind);
        row.status = ParticipantVote::Prepared;
        row.done_at = Some(now);
        self.touch(now);
    }

    pub fn record_prepare_failure(&mut self, kind: ResourceKind, error: impl Into<String>, now: DateTime<Utc>) {
        let row = self.row_mut(kind);
        row.status = ParticipantVote::Failed;
        row.error = Some(error.into());
        row.done_at = Some(now);
        self.touch(now);
    }

    pub fn bump_retry(&mut self, kind: ResourceKind) -> u32 {
        let row = self.row_mut(kind);
        row.retry_count += 1;
        row.retry_count
    }

    /// `true` once every participant voted `Prepared` — the coordinator's
    /// cue to begin the commit phase.
    pub fn all_prepared(&self) -> bool {
        self.participants.iter().all(|p| p.status == ParticipantVote::Prepared)
    }

    pub fn any_prepare_failed(&self) -> bool {
        self.participants.iter().any(|p| p.status == ParticipantVote::Failed)
    }

    pub fn record_commit_success(&mut self, kind: ResourceKind, now: DateTime<Utc>) {
        let row = self.row_mut(kind);
        row.status = ParticipantVote::Committed;
        row.done_at = Some(now);
        self.touch(now);
    }

    pub fn all_committed(&self) -> bool {
        self.participants.iter().all(|p| p.status == ParticipantVote::Committed)
    }

    /// Go to Abort: some participant failed (or timed out) during Prepare
    /// (spec §4.3 step 2 / §4.3 "Participant failure modes").
    pub fn finalize_aborted(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.status = TxStatus::Aborted;
        self.failure_reason = Some(reason.into());
        self.done_at = Some(now);
        self.touch(now);
    }

    /// Commit-phase failure after retries exhausted: administrator
    /// intervention, no abort messages sent (spec §4.3 step 3).
    pub fn finalize_rolled_back(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.status = TxStatus::RolledBack;
        self.failure_reason = Some(reason.into());
        self.done_at = Some(now);
        self.touch(now);
    }

    pub fn finalize_committed(&mut self, now: DateTime<Utc>) {
        self.status = TxStatus::Committed;
        self.commit_timestamp = Some(now);
        self.done_at = Some(now);
        self.touch(now);
    }

    /// Sweeper-only terminal transition (spec §4.3 timeout sweeper, §9
    /// coordinator-crash recovery: "the safe default is sweeper-only
    /// recovery").
    pub fn finalize_timed_out(&mut self, now: DateTime<Utc>) {
        self.status = TxStatus::TimedOut;
        self.failure_reason = Some("transaction timed out".to_string());
        self.done_at = Some(now);
        self.touch(now);
    }

    fn touch(&mut self, _now: DateTime<Utc>) {
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Vec<(ResourceKind, String)> {
        vec![
            (ResourceKind::Hotel, "http://hotel".to_string()),
            (ResourceKind::Car, "http://car".to_string()),
            (ResourceKind::Train, "http://train".to_string()),
        ]
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn participants_are_seeded_in_fixed_order() {
        let log = TransactionLog::new(OrderId::new(), &endpoints(), now(), 3);
        let kinds: Vec<_> = log.participants.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![ResourceKind::Hotel, ResourceKind::Car, ResourceKind::Train]);
        assert!(log.participants.iter().all(|p| p.status == ParticipantVote::Pending));
    }

    #[test]
    fn all_prepared_only_after_every_participant_votes() {
        let mut log = TransactionLog::new(OrderId::new(), &endpoints(), now(), 3);
        log.start_prepare_phase(now()).unwrap();
        log.record_prepare_success(ResourceKind::Hotel, now());
        log.record_prepare_success(ResourceKind::Car, now());
        assert!(!log.all_prepared());
        log.record_prepare_success(ResourceKind::Train, now());
        assert!(log.all_prepared());
    }

    #[test]
    fn one_prepare_failure_is_detected_without_waiting_for_the_rest() {
        let mut log = TransactionLog::new(OrderId::new(), &endpoints(), now(), 3);
        log.start_prepare_phase(now()).unwrap();
        log.record_prepare_success(ResourceKind::Hotel, now());
        log.record_prepare_failure(ResourceKind::Car, "not available", now());
        assert!(log.any_prepare_failed());
        log.finalize_aborted("car: not available", now());
        assert_eq!(log.status, TxStatus::Aborted);
        assert!(log.failure_reason.is_some());
    }

    #[test]
    fn commit_failure_after_prepare_is_rolled_back_not_aborted() {
        let mut log = TransactionLog::new(OrderId::new(), &endpoints(), now(), 3);
        log.start_prepare_phase(now()).unwrap();
        for kind in ResourceKind::all() {
            log.record_prepare_success(kind, now());
        }
        log.record_commit_success(ResourceKind::Hotel, now());
        // Car's commit call exhausts retries.
        log.finalize_rolled_back("car: commit unreachable after retries", now());
        assert_eq!(log.status, TxStatus::RolledBack);
    }

    #[test]
    fn happy_path_reaches_committed_with_timestamp() {
        let mut log = TransactionLog::new(OrderId::new(), &endpoints(), now(), 3);
        log.start_prepare_phase(now()).unwrap();
        for kind in ResourceKind::all() {
            log.record_prepare_success(kind, now());
        }
        assert!(log.all_prepared());
        for kind in ResourceKind::all() {
            log.record_commit_success(kind, now());
        }
        assert!(log.all_committed());
        log.finalize_committed(now());
        assert_eq!(log.status, TxStatus::Committed);
        assert!(log.commit_timestamp.is_some());
    }

    #[test]
    fn sweepable_statuses_are_exactly_initiated_and_prepared() {
        assert!(TxStatus::Initiated.is_sweepable());
        assert!(TxStatus::Prepared.is_sweepable());
        assert!(!TxStatus::Committed.is_sweepable());
        assert!(!TxStatus::TimedOut.is_sweepable());
    }

    #[test]
    fn version_bumps_on_every_mutation_for_optimistic_concurrency() {
        let mut log = TransactionLog::new(OrderId::new(), &endpoints(), now(), 3);
        let v0 = log.version;
        log.start_prepare_phase(now()).unwrap();
        assert!(log.version > v0);
    }
}
