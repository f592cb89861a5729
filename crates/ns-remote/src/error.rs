use ns_core::CallFailure;
use thiserror::Error;

/// Failure reported by a remote collaborator, already classified.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("rate limited by remote service: {0}")]
    RateLimited(String),
    #[error("transient remote failure: {0}")]
    Transient(String),
    #[error("remote call rejected: {0}")]
    Terminal(String),
    #[error("deadline exceeded during {0}")]
    DeadlineExceeded(String),
}

impl RemoteError {
    /// Only explicit throttling or intermittent failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::RateLimited(_) | RemoteError::Transient(_))
    }

    pub fn failure(&self) -> CallFailure {
        match self {
            RemoteError::RateLimited(_) | RemoteError::Transient(_) => CallFailure::Transient,
            RemoteError::Terminal(_) => CallFailure::Terminal,
            RemoteError::DeadlineExceeded(_) => CallFailure::Deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(RemoteError::RateLimited("429".into()).is_retryable());
        assert!(RemoteError::Transient("503".into()).is_retryable());
        assert!(!RemoteError::Terminal("400".into()).is_retryable());
        assert!(!RemoteError::DeadlineExceeded("generate".into()).is_retryable());
        assert_eq!(RemoteError::DeadlineExceeded("x".into()).failure(), CallFailure::Deadline);
        assert_eq!(RemoteError::RateLimited("x".into()).failure(), CallFailure::Transient);
    }
}
