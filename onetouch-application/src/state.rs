//! Session state machine and synchronization bookkeeping

use crate::command::LimitKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a pending measurement request addressed its record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordAddress {
    /// Position in the meter's record list, 0 is the newest
    Index(u16),
    /// Stable record id
    Id(u16),
}

/// Direction of a pending limit request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitOp {
    Read,
    /// Carries the value being written, reported back once acknowledged
    Write(u16),
}

/// Session state
///
/// Every state other than `Idle` means exactly one request is outstanding.
/// The waiting states carry what the response will be interpreted against, so
/// a response can only ever be matched to the request that caused it.
///
/// # State Transitions
/// ```text
/// Idle -> WaitingTime                  (connect())
/// WaitingTime -> WaitingTime           (device time received, set-time sent)
/// WaitingTime -> WaitingOldestIndex    (time set, not yet synced)
/// WaitingTime -> WaitingHighestId      (time set, already synced)
/// WaitingOldestIndex -> WaitingMeasurement(Index)
/// WaitingMeasurement(Index) -> WaitingMeasurement(Index)   (index > 0)
/// WaitingMeasurement(Index) -> WaitingHighestId            (index == 0)
/// WaitingHighestId -> WaitingMeasurement(Id)               (new records)
/// WaitingHighestId -> Idle                                 (up to date)
/// WaitingMeasurement(Id) -> WaitingMeasurement(Id) | Idle
/// WaitingLimit -> Idle
/// any -> Idle                          (disconnect(), response timeout)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    WaitingTime,
    WaitingHighestId,
    WaitingOldestIndex,
    WaitingMeasurement { address: RecordAddress },
    WaitingLimit { kind: LimitKind, op: LimitOp },
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::WaitingTime => "WaitingTime",
            SessionState::WaitingHighestId => "WaitingHighestId",
            SessionState::WaitingOldestIndex => "WaitingOldestIndex",
            SessionState::WaitingMeasurement { .. } => "WaitingMeasurement",
            SessionState::WaitingLimit { .. } => "WaitingLimit",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::WaitingMeasurement { address } => match address {
                RecordAddress::Index(index) => write!(f, "WaitingMeasurement(index {})", index),
                RecordAddress::Id(id) => write!(f, "WaitingMeasurement(id {})", id),
            },
            SessionState::WaitingLimit { kind, .. } => write!(f, "WaitingLimit({:?})", kind),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Record synchronization progress
///
/// `highest_synced_id <= highest_known_id` always holds. `committed_id` is the
/// highest id whose batch has been handed to the application; an aborted
/// exchange rolls the other two back to it so no record is skipped on the
/// next poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncState {
    /// Highest record id the meter has reported
    pub highest_known_id: u16,
    /// Highest record id fetched so far
    pub highest_synced_id: u16,
    /// Record count reported by the last oldest-index query
    pub total_record_count: u16,
    /// A full index sweep has completed at least once
    pub synced_to_latest: bool,
    committed_id: u16,
}

impl SyncState {
    /// State for a host that already holds every record up to `highest_id`
    ///
    /// The next poll skips the index sweep and asks only for newer ids.
    pub fn resume(highest_id: u16) -> Self {
        Self {
            highest_known_id: highest_id,
            highest_synced_id: highest_id,
            total_record_count: 0,
            synced_to_latest: true,
            committed_id: highest_id,
        }
    }

    pub fn committed_id(&self) -> u16 {
        self.committed_id
    }

    /// Record that everything fetched so far reached the application
    pub(crate) fn commit(&mut self) {
        self.committed_id = self.highest_synced_id;
    }

    /// Forget progress that never reached the application
    pub(crate) fn rollback(&mut self) {
        self.highest_known_id = self.committed_id;
        self.highest_synced_id = self.committed_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::default(), SessionState::Idle);
        let state = SessionState::WaitingMeasurement {
            address: RecordAddress::Id(7),
        };
        assert_eq!(state.as_str(), "WaitingMeasurement");
        assert_eq!(state.to_string(), "WaitingMeasurement(id 7)");
        assert!(!state.is_idle());
    }

    #[test]
    fn test_rollback_returns_to_commit_point() {
        let mut sync = SyncState::resume(5);
        sync.highest_known_id = 9;
        sync.highest_synced_id = 7;
        sync.rollback();
        assert_eq!(sync, SyncState::resume(5));

        sync.highest_known_id = 9;
        sync.highest_synced_id = 9;
        sync.commit();
        sync.rollback();
        assert_eq!(sync.highest_known_id, 9);
        assert_eq!(sync.committed_id(), 9);
    }
}
