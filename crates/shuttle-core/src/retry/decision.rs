//! Decision: next action after a failed attempt.

use std::time::Duration;

use super::{NextAttempt, RetryContext, RetryPolicy};
use crate::domain::TaskFailure;

/// The next action to take for a task whose attempt just failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Run another attempt after `delay`.
    Retry {
        delay: Duration,
        next: NextAttempt,
        reason: String,
    },

    /// Stop; the task ends in `Error`.
    GiveUp { reason: String },
}

/// Pure decision function: the policy predicate first, then the budget.
///
/// The context is consumed on every path.
pub fn decide(policy: &dyn RetryPolicy, failure: &TaskFailure, ctx: RetryContext) -> Decision {
    if !policy.should_retry(failure, &ctx) {
        return Decision::GiveUp {
            reason: format!("{} does not retry {:?}", policy.name(), failure.kind),
        };
    }

    let attempts = ctx.attempt();
    let max_attempts = policy.max_attempts();
    if attempts >= max_attempts {
        return Decision::GiveUp {
            reason: format!("Max attempts reached: {attempts}/{max_attempts}"),
        };
    }

    let delay = policy.delay();
    Decision::Retry {
        delay,
        next: policy.next_attempt(ctx),
        reason: format!(
            "Retry attempt {}/{} after {:?}",
            attempts + 1,
            max_attempts,
            delay
        ),
    }
}
