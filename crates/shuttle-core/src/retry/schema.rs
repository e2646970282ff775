//! Transient-infrastructure retry for schema changes.

use std::time::Duration;

use super::{RetryContext, RetryPolicy};
use crate::domain::{FailureKind, TaskFailure};

/// Retries timeouts and `Unavailable` only (explicit allow-list).
///
/// Malformed queries are never retried: they would fail the same way again.
#[derive(Debug, Clone, Copy)]
pub struct SchemaChangeRetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl SchemaChangeRetryPolicy {
    /// `max_attempts` is clamped to at least one attempt.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl RetryPolicy for SchemaChangeRetryPolicy {
    fn name(&self) -> &'static str {
        "schema_change"
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn should_retry(&self, failure: &TaskFailure, _ctx: &RetryContext) -> bool {
        matches!(failure.kind, FailureKind::Timeout | FailureKind::Unavailable)
    }
}
