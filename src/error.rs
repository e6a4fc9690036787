//! Error types for the storage quota operator
//!
//! Provides structured error types for the reconciler, the usage collector,
//! and the surrounding process wiring.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the operator
#[derive(Error, Debug)]
pub enum Error {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Quantity parse error: {0}")]
    CapacityParse(String),

    #[error("Metrics registration error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient API failures - a re-run of the whole pass converges
            // any partially-applied state
            Error::Kube(_) | Error::Internal(_) | Error::Io(_) => ErrorAction::RequeueWithBackoff,

            // Malformed input - retrying cannot help until the spec changes
            Error::Configuration(_) | Error::CapacityParse(_) => ErrorAction::NoRequeue,

            // Registration failures are startup-time only
            Error::Metrics(_) => ErrorAction::RequeueAfter(Duration::from_secs(60)),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }
}

/// Result type alias for the operator
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_actions() {
        let err = Error::CapacityParse("bad suffix".into());
        assert_eq!(err.action(), ErrorAction::NoRequeue);
        assert!(!err.is_retryable());

        let err = Error::Internal("server gone".into());
        assert_eq!(err.action(), ErrorAction::RequeueWithBackoff);
        assert!(err.is_retryable());
    }
}
