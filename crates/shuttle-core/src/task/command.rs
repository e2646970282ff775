//! Command behaviour: how one kind of command builds its unit of work and
//! reads the result.

use crate::domain::{DocumentId, ResultSet, Statement, TaskFailure, TaskPayload};

/// Per-command behaviour plugged into the generic [`super::Task`].
///
/// Implementations own whatever they built for their own execution and share
/// nothing mutable with sibling tasks.
pub trait Command: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Checks inputs when the task is prepared. A failure here stores the
    /// failure and the task never becomes `Ready`.
    fn validate(&self) -> Result<(), TaskFailure> {
        Ok(())
    }

    /// Builds the statement for one attempt.
    ///
    /// Errors are converted into the task's `Error` state; they are not retried.
    fn build(&self) -> Result<Statement, TaskFailure>;

    /// Turns the rows of a successful execution into the task payload.
    fn decode(&self, result: ResultSet) -> Result<TaskPayload, TaskFailure>;

    /// Id of the document this command targets, when it has one.
    fn document_id(&self) -> Option<DocumentId> {
        None
    }
}
