//! The 2PC subsystem's pure types: the coordinator's `TransactionLog` and
//! each participant's local log row (spec §3.4, §4.3, §4.4).

pub mod participant_log;
pub mod transaction;

pub use participant_log::{ParticipantLog, ParticipantLogStatus};
pub use transaction::{ParticipantRow, ParticipantVote, TransactionLog, TxStatus};
