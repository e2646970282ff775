//! State shared by every task type: status, failure, warnings, attempts.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{
    AttemptRecord, InternalFault, TaskFailure, TaskId, TaskStatus, Warning, WarningCode,
};

/// Lifecycle of one task.
///
/// All transitions go through [`TaskLifecycle::transition`], which refuses
/// edges the state machine does not allow.
#[derive(Debug, Clone)]
pub struct TaskLifecycle {
    id: TaskId,
    position: usize,
    status: TaskStatus,
    failure: Option<TaskFailure>,
    warnings: Vec<Warning>,
    suppressed: HashSet<WarningCode>,
    attempts: Vec<AttemptRecord>,
}

impl TaskLifecycle {
    pub fn new(id: TaskId, position: usize) -> Self {
        Self {
            id,
            position,
            status: TaskStatus::Uninitialized,
            failure: None,
            warnings: Vec::new(),
            suppressed: HashSet::new(),
            attempts: Vec::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// 0-based index in the user's input batch. Sole ordering key of results.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        self.failure.as_ref()
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// All warnings, suppressed ones included.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Warnings that should reach the response.
    pub fn visible_warnings(&self) -> impl Iterator<Item = &Warning> {
        self.warnings
            .iter()
            .filter(|w| !self.suppressed.contains(&w.code))
    }

    pub fn transition(&mut self, to: TaskStatus) -> Result<(), InternalFault> {
        if !self.status.can_transition_to(to) {
            return Err(InternalFault::IllegalTransition {
                position: self.position,
                from: self.status,
                to,
            });
        }
        debug!(task_id = %self.id, position = self.position, from = ?self.status, to = ?to, "task transition");
        self.status = to;
        Ok(())
    }

    pub fn mark_ready(&mut self) -> Result<(), InternalFault> {
        self.transition(TaskStatus::Ready)
    }

    /// Ready -> Skipped. Used by fail-fast scheduling only.
    pub fn skip(&mut self) -> Result<(), InternalFault> {
        self.transition(TaskStatus::Skipped)
    }

    /// Stores `failure` unless one is already stored (first failure wins),
    /// or `supersede` is set.
    pub fn record_failure(&mut self, failure: TaskFailure, supersede: bool) {
        if self.failure.is_none() || supersede {
            self.failure = Some(failure);
        }
    }

    /// Records `failure` and moves to `Error`.
    pub fn fail(&mut self, failure: TaskFailure) -> Result<(), InternalFault> {
        self.record_failure(failure, false);
        self.transition(TaskStatus::Error)
    }

    pub fn add_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Hides warnings with `code` from the response; they are still kept.
    pub fn suppress(&mut self, code: WarningCode) {
        self.suppressed.insert(code);
    }

    pub fn push_attempt(&mut self, attempt: AttemptRecord) {
        self.attempts.push(attempt);
    }
}
