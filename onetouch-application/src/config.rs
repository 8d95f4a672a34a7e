//! Session configuration

use onetouch_core::OneTouchResult;
use onetouch_session::LinkParameters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on the wait for a single response
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub link: LinkParameters,
    /// `None` disables the response watchdog
    pub response_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.link.mtu = mtu;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn validate(&self) -> OneTouchResult<()> {
        self.link.validate()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            link: LinkParameters::default(),
            response_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.link.mtu, 20);
        assert_eq!(config.response_timeout, Some(Duration::from_secs(5)));
        assert!(config.validate().is_ok());
        assert!(config.with_mtu(1).validate().is_err());
    }
}
