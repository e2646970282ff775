//! Task lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Task status.
///
/// State transitions:
/// - Uninitialized -> Ready (the command validated its inputs)
/// - Uninitialized -> Error (inputs rejected before the task could run)
/// - Ready -> InProgress -> Completed
/// - Ready -> InProgress -> Error (failure stored, retries exhausted or refused)
/// - Ready -> Skipped (an earlier sibling failed in fail-fast mode)
///
/// Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Created, inputs not yet validated.
    Uninitialized,

    /// Validated and able to run.
    Ready,

    /// Currently executing (including retries).
    InProgress,

    /// Finished successfully.
    Completed,

    /// Finished with a stored failure.
    Error,

    /// Deliberately not run.
    Skipped,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Error | TaskStatus::Skipped
        )
    }

    /// Whether `self -> next` is a legal edge of the state machine.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Uninitialized, Ready)
                | (Uninitialized, Error)
                | (Ready, InProgress)
                | (Ready, Skipped)
                | (InProgress, Completed)
                | (InProgress, Error)
        )
    }

    /// Status label used in per-document responses.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Uninitialized => "UNINITIALIZED",
            TaskStatus::Ready => "READY",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "OK",
            TaskStatus::Error => "ERROR",
            TaskStatus::Skipped => "SKIPPED",
        }
    }
}
