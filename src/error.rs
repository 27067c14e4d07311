use std::time::Duration;

use thiserror::Error;

/// Why a delivery attempt failed. Every variant is recovered by the
/// transport (re-queue or drop); none reaches tracking callers.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
    #[error("collector unreachable: {0}")]
    Connection(String),
    #[error("collector answered HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status(status.as_u16())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

impl TransportError {
    /// Failures that mean "the network is not there", as opposed to a
    /// collector that answered badly.
    pub fn is_network(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_report_the_limit_that_expired() {
        let err = TransportError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "delivery timed out after 5s");
        assert!(err.is_network());
    }

    #[test]
    fn collector_answers_are_not_network_failures() {
        assert!(!TransportError::Status(503).is_network());
        assert!(!TransportError::Request("bad body".into()).is_network());
        assert!(TransportError::Connection("refused".into()).is_network());
    }
}
