//! Attempt history for task execution.

use serde::{Deserialize, Serialize};

use super::errors::TaskFailure;
use super::statement::Statement;

/// A single execution attempt of a task.
///
/// Only the first failure is surfaced in the response; the history keeps
/// every attempt so later (possibly more specific) causes are not lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub attempt: u32,

    /// What was sent, if the attempt got as far as building a statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<Statement>,

    /// `None` when the attempt succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<TaskFailure>,
}

impl AttemptRecord {
    pub fn succeeded(attempt: u32, statement: Option<Statement>) -> Self {
        Self {
            attempt,
            statement,
            failure: None,
        }
    }

    pub fn failed(attempt: u32, statement: Option<Statement>, failure: TaskFailure) -> Self {
        Self {
            attempt,
            statement,
            failure: Some(failure),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}
