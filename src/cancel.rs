//! Deadline/cancellation signal accepted at the pipeline's entry point
//! (§5): `Orchestrator::analyze` takes one of these, and `AnomalyModel`
//! `predict` and `attribution::explain` check it between batches (at
//! least once per 1024 samples for predict, once per sample-block for
//! explain) rather than only at the very start or end of their work.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

/// A deadline is either an explicit cancellation signal, a wall-clock
/// expiry, or both. `Deadline::none()` never expires — the default for
/// callers that don't need cancellation (most unit tests).
#[derive(Debug, Clone)]
pub struct Deadline {
    cancel: CancellationToken,
    expires_at: Option<Instant>,
}

impl Deadline {
    #[must_use]
    pub fn none() -> Self {
        Self {
            cancel: CancellationToken::new(),
            expires_at: None,
        }
    }

    #[must_use]
    pub fn with_timeout(duration: std::time::Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            expires_at: Some(Instant::now() + duration),
        }
    }

    /// A token the caller can cancel explicitly from another task, paired
    /// with this deadline's timeout (if any).
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.cancel.is_cancelled() || self.expires_at.is_some_and(|t| Instant::now() >= t)
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}
