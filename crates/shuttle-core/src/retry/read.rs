//! Content-aware retry for reads.

use std::time::Duration;

use super::{NextAttempt, RetryContext, RetryPolicy};
use crate::domain::{FailureKind, TaskFailure, Warning, WarningCode};

/// Retries a read exactly once, with ALLOW FILTERING appended, when the
/// database rejected it for filtering on a non-indexed column.
///
/// A second rejection for the same cause is final: the resubmitted statement
/// already carries the flag, so `should_retry` refuses.
#[derive(Debug, Clone, Copy)]
pub struct AllowFilteringRetryPolicy {
    delay: Duration,
}

impl AllowFilteringRetryPolicy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for AllowFilteringRetryPolicy {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl RetryPolicy for AllowFilteringRetryPolicy {
    fn name(&self) -> &'static str {
        "allow_filtering"
    }

    fn max_attempts(&self) -> u32 {
        2
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    fn should_retry(&self, failure: &TaskFailure, ctx: &RetryContext) -> bool {
        failure.kind == FailureKind::MissingScanFlag
            && ctx
                .statement()
                .is_some_and(|statement| !statement.allows_filtering())
    }

    fn next_attempt(&self, ctx: RetryContext) -> NextAttempt {
        match ctx.statement().and_then(|s| s.with_allow_filtering()) {
            Some(statement) => NextAttempt::resubmit(statement).with_warning(Warning::new(
                WarningCode::AllowFilteringApplied,
                "Read filters on columns without an index; it was retried with ALLOW FILTERING \
                 and may scan the whole table.",
            )),
            None => NextAttempt::rebuild(),
        }
    }

    /// Once the flag was applied the original rejection no longer describes
    /// what went wrong.
    fn supersedes(&self, stored: &TaskFailure, _latest: &TaskFailure) -> bool {
        stored.kind == FailureKind::MissingScanFlag
    }
}
