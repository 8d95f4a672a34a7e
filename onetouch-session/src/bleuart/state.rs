//! Fragment link state machine

use std::fmt;

/// Fragment link state
///
/// An exchange is either a send or a receive, never both.
///
/// # Why One Exchange At A Time?
/// The header count is only four bits and carries no sequence number, so the
/// peer can only tell fragments apart by their position in the exchange:
/// - **ACK Matching**: an ACK echoes the count of the fragment it confirms
/// - **Reassembly**: CONTINUATION counts must fall by one each time
/// - **Recovery**: `reset()` is the only way out of a stalled exchange
///
/// # State Transitions
/// ```text
/// Idle -> Sending    (send())
/// Sending -> Idle    (last ACK received)
/// Idle -> Receiving  (FIRST fragment with more to follow)
/// Idle -> Idle       (single-fragment buffer received)
/// Receiving -> Idle  (last CONTINUATION received)
/// any -> Idle        (reset())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No exchange in flight; a send may start or a FIRST fragment may arrive
    #[default]
    Idle,
    /// Outbound buffer in flight, waiting for an ACK per fragment
    Sending,
    /// Inbound buffer being reassembled
    Receiving,
}

impl LinkState {
    pub fn is_idle(&self) -> bool {
        matches!(self, LinkState::Idle)
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Idle => "Idle",
            LinkState::Sending => "Sending",
            LinkState::Receiving => "Receiving",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
