//! Error taxonomy for the analysis pipeline.
//!
//! Failures are sorted into the categories the worker acts on: transient
//! upstream errors are retried via the stale sweep (up to a bounded
//! attempt count), permanent input errors fail the job immediately,
//! storage errors abort the whole pass, and invariant violations surface
//! as job failures without being clamped away.

use thiserror::Error;

/// Errors from upstream collaborator fetches.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network failure, timeout, or upstream 5xx. Retryable.
    #[error("upstream request failed: {0}")]
    Network(String),

    /// Upstream rate limit hit. Retryable after backoff.
    #[error("upstream rate limit exceeded: {0}")]
    RateLimited(String),

    /// The requested entity does not exist upstream. Not retryable.
    #[error("not found: {0}")]
    NotFound(String),

    /// Upstream returned data we could not interpret. Not retryable.
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Returns true if retrying the same request later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited(_))
    }
}

/// Failure category for a single analysis job.
#[derive(Error, Debug)]
pub enum JobFailure {
    /// Retryable upstream failure; the job goes back through the sweep
    /// until the attempt bound is hit.
    #[error("transient: {0}")]
    Transient(String),

    /// Bad input (unknown or malformed match id). Failed immediately.
    #[error("permanent: {0}")]
    Permanent(String),

    /// A programming contract was broken, e.g. a normalized signal
    /// outside [0,1]. Failed and logged, never silently corrected.
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl JobFailure {
    /// Classifies a provider error into a job failure.
    #[must_use]
    pub fn from_provider(err: &ProviderError) -> Self {
        if err.is_transient() {
            Self::Transient(err.to_string())
        } else {
            Self::Permanent(err.to_string())
        }
    }

    /// Returns true if the job should be retried on a later pass.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Operator-facing message stored on the job row. Users only ever
    /// see a generic failure notice from the front end.
    #[must_use]
    pub fn operator_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_transience() {
        assert!(ProviderError::Network("timeout".into()).is_transient());
        assert!(ProviderError::RateLimited("429".into()).is_transient());
        assert!(!ProviderError::NotFound("match abc".into()).is_transient());
        assert!(!ProviderError::Malformed("bad json".into()).is_transient());
    }

    #[test]
    fn test_job_failure_classification() {
        let transient = JobFailure::from_provider(&ProviderError::Network("reset".into()));
        assert!(transient.is_retryable());

        let permanent = JobFailure::from_provider(&ProviderError::NotFound("gone".into()));
        assert!(!permanent.is_retryable());

        assert!(!JobFailure::Invariant("confidence 1.2".into()).is_retryable());
    }

    #[test]
    fn test_operator_message_keeps_detail() {
        let failure = JobFailure::Permanent("match id xyz not found".into());
        assert!(failure.operator_message().contains("xyz"));
    }
}
