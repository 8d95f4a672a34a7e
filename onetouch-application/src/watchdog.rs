//! Response watchdog
//!
//! The session has no timer of its own. The owner reports elapsed time through
//! `tick()`, and the watchdog says when an outstanding request has waited too
//! long.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ResponseWatchdog {
    timeout: Option<Duration>,
    waited: Duration,
    armed: bool,
}

impl ResponseWatchdog {
    /// Create a watchdog; `None` never expires
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            waited: Duration::ZERO,
            armed: false,
        }
    }

    /// Start waiting for a response
    pub fn arm(&mut self) {
        self.armed = true;
        self.waited = Duration::ZERO;
    }

    /// Restart the wait after inbound activity
    pub fn touch(&mut self) {
        if self.armed {
            self.waited = Duration::ZERO;
        }
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.waited = Duration::ZERO;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Account for elapsed time
    ///
    /// Returns the total time waited when the bound is reached. The watchdog
    /// disarms itself at that point.
    pub fn advance(&mut self, elapsed: Duration) -> Option<Duration> {
        let timeout = self.timeout?;
        if !self.armed {
            return None;
        }
        self.waited = self.waited.saturating_add(elapsed);
        if self.waited >= timeout {
            let waited = self.waited;
            self.disarm();
            Some(waited)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_once() {
        let mut watchdog = ResponseWatchdog::new(Some(Duration::from_secs(5)));
        watchdog.arm();
        assert_eq!(watchdog.advance(Duration::from_secs(3)), None);
        assert_eq!(
            watchdog.advance(Duration::from_secs(3)),
            Some(Duration::from_secs(6))
        );
        assert!(!watchdog.is_armed());
        assert_eq!(watchdog.advance(Duration::from_secs(10)), None);
    }

    #[test]
    fn test_touch_restarts_wait() {
        let mut watchdog = ResponseWatchdog::new(Some(Duration::from_secs(5)));
        watchdog.arm();
        watchdog.advance(Duration::from_secs(4));
        watchdog.touch();
        assert_eq!(watchdog.advance(Duration::from_secs(4)), None);
    }

    #[test]
    fn test_disabled_and_disarmed() {
        let mut disabled = ResponseWatchdog::new(None);
        disabled.arm();
        assert_eq!(disabled.advance(Duration::from_secs(3600)), None);

        let mut idle = ResponseWatchdog::new(Some(Duration::from_millis(1)));
        assert_eq!(idle.advance(Duration::from_secs(1)), None);
    }
}
