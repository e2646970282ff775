//! Retry policies: whether, how many times and after what delay a failed
//! attempt is retried.
//!
//! A policy is a pure function of the failure and of the [`RetryContext`]
//! handed to it. The context carries the statement of the attempt that just
//! failed; it is moved into [`RetryPolicy::next_attempt`] and dropped there,
//! so nothing from one execution can leak into another.

mod decision;
mod read;
mod schema;

pub use decision::{Decision, decide};
pub use read::AllowFilteringRetryPolicy;
pub use schema::SchemaChangeRetryPolicy;

use std::fmt;
use std::time::Duration;

use crate::domain::{Statement, TaskFailure, Warning};

/// Feedback from the attempt that just failed.
#[derive(Debug)]
pub struct RetryContext {
    attempt: u32,
    statement: Option<Statement>,
}

impl RetryContext {
    /// `attempt` is 1-based: the number of attempts made so far.
    pub fn new(attempt: u32, statement: Option<Statement>) -> Self {
        Self { attempt, statement }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn statement(&self) -> Option<&Statement> {
        self.statement.as_ref()
    }

    pub fn into_statement(self) -> Option<Statement> {
        self.statement
    }
}

/// How the next attempt is produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NextAttempt {
    /// Statement to resubmit as-is. `None` means the command rebuilds it.
    pub statement: Option<Statement>,

    /// Warning to attach to the task when the retry happens.
    pub warning: Option<Warning>,
}

impl NextAttempt {
    pub fn rebuild() -> Self {
        Self::default()
    }

    pub fn resubmit(statement: Statement) -> Self {
        Self {
            statement: Some(statement),
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: Warning) -> Self {
        self.warning = Some(warning);
        self
    }
}

pub trait RetryPolicy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Total attempts allowed, first attempt included. Always >= 1.
    fn max_attempts(&self) -> u32;

    fn delay(&self) -> Duration;

    /// Consulted after every failed attempt, before the budget is checked.
    fn should_retry(&self, failure: &TaskFailure, ctx: &RetryContext) -> bool;

    /// Produces the next attempt. Only called after `should_retry` said yes
    /// and the budget allows another attempt.
    fn next_attempt(&self, ctx: RetryContext) -> NextAttempt {
        drop(ctx);
        NextAttempt::rebuild()
    }

    /// Whether `latest` replaces the failure already stored on the task.
    fn supersedes(&self, _stored: &TaskFailure, _latest: &TaskFailure) -> bool {
        false
    }
}

/// One attempt, never retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetryPolicy;

impl RetryPolicy for NoRetryPolicy {
    fn name(&self) -> &'static str {
        "no_retry"
    }

    fn max_attempts(&self) -> u32 {
        1
    }

    fn delay(&self) -> Duration {
        Duration::ZERO
    }

    fn should_retry(&self, _failure: &TaskFailure, _ctx: &RetryContext) -> bool {
        false
    }
}
