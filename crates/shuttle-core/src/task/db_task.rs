//! Generic database task: a [`Command`] driven through the retry loop.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Command, Executable, TaskLifecycle};
use crate::app::ExecutionContext;
use crate::domain::{
    AttemptRecord, DocumentId, InternalFault, Statement, TaskId, TaskPayload, TaskStatus, Warning,
    WarningCode,
};
use crate::retry::{Decision, NoRetryPolicy, RetryContext, RetryPolicy, decide};

pub struct Task<C> {
    lifecycle: TaskLifecycle,
    command: C,
    retry_policy: Arc<dyn RetryPolicy>,
    payload: Option<TaskPayload>,
}

impl<C: Command> Task<C> {
    /// New task in `Uninitialized`; call [`Task::prepare`] before scheduling.
    pub fn new(id: TaskId, position: usize, command: C, retry_policy: Arc<dyn RetryPolicy>) -> Self {
        Self {
            lifecycle: TaskLifecycle::new(id, position),
            command,
            retry_policy,
            payload: None,
        }
    }

    /// Task that is attempted exactly once.
    pub fn once(id: TaskId, position: usize, command: C) -> Self {
        Self::new(id, position, command, Arc::new(NoRetryPolicy))
    }

    pub fn command(&self) -> &C {
        &self.command
    }

    /// Validates the command and moves to `Ready`, or to `Error` with the
    /// validation failure stored.
    pub fn prepare(&mut self) -> Result<(), InternalFault> {
        match self.command.validate() {
            Ok(()) => self.lifecycle.mark_ready(),
            Err(failure) => {
                debug!(position = self.lifecycle.position(), %failure, "task failed validation");
                self.lifecycle.fail(failure)
            }
        }
    }

    /// Prepared task, ready for scheduling.
    pub fn prepared(mut self) -> Result<Self, InternalFault> {
        self.prepare()?;
        Ok(self)
    }
}

#[async_trait]
impl<C: Command> Executable for Task<C> {
    fn name(&self) -> &str {
        self.command.name()
    }

    fn lifecycle(&self) -> &TaskLifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut TaskLifecycle {
        &mut self.lifecycle
    }

    fn payload(&self) -> Option<&TaskPayload> {
        self.payload.as_ref()
    }

    fn document_id(&self) -> Option<DocumentId> {
        self.command.document_id()
    }

    async fn execute(&mut self, ctx: &ExecutionContext) -> Result<(), InternalFault> {
        let position = self.lifecycle.position();
        match self.lifecycle.status() {
            // failed validation: already terminal, nothing to send
            TaskStatus::Error => return Ok(()),
            TaskStatus::Ready => {}
            from => {
                return Err(InternalFault::IllegalTransition {
                    position,
                    from,
                    to: TaskStatus::InProgress,
                });
            }
        }
        self.lifecycle.transition(TaskStatus::InProgress)?;

        let mut attempt = 0u32;
        let mut resubmit: Option<Statement> = None;
        loop {
            attempt += 1;

            let statement = match resubmit.take() {
                Some(statement) => statement,
                None => match self.command.build() {
                    Ok(statement) => statement,
                    Err(failure) => {
                        self.lifecycle
                            .push_attempt(AttemptRecord::failed(attempt, None, failure.clone()));
                        return self.lifecycle.fail(failure);
                    }
                },
            };

            match ctx.executor().execute(&statement).await {
                Ok(result) => {
                    for message in &result.warnings {
                        self.lifecycle
                            .add_warning(Warning::new(WarningCode::Database, message.clone()));
                    }
                    return match self.command.decode(result) {
                        Ok(payload) => {
                            self.lifecycle
                                .push_attempt(AttemptRecord::succeeded(attempt, Some(statement)));
                            self.payload = Some(payload);
                            self.lifecycle.transition(TaskStatus::Completed)
                        }
                        Err(failure) => {
                            self.lifecycle.push_attempt(AttemptRecord::failed(
                                attempt,
                                Some(statement),
                                failure.clone(),
                            ));
                            self.lifecycle.fail(failure)
                        }
                    };
                }
                Err(raw) => {
                    let failure = ctx.classifier().classify(raw);
                    self.lifecycle.push_attempt(AttemptRecord::failed(
                        attempt,
                        Some(statement.clone()),
                        failure.clone(),
                    ));
                    let supersede = self
                        .lifecycle
                        .failure()
                        .is_some_and(|stored| self.retry_policy.supersedes(stored, &failure));
                    self.lifecycle.record_failure(failure.clone(), supersede);

                    let ctx_for_retry = RetryContext::new(attempt, Some(statement));
                    match decide(self.retry_policy.as_ref(), &failure, ctx_for_retry) {
                        Decision::Retry {
                            delay,
                            next,
                            reason,
                        } => {
                            warn!(
                                task = self.command.name(),
                                position,
                                attempt,
                                code = failure.code(),
                                %reason,
                                "retrying task"
                            );
                            if let Some(warning) = next.warning {
                                self.lifecycle.add_warning(warning);
                            }
                            resubmit = next.statement;
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                        }
                        Decision::GiveUp { reason } => {
                            debug!(
                                task = self.command.name(),
                                position,
                                attempt,
                                %reason,
                                "giving up"
                            );
                            return self.lifecycle.transition(TaskStatus::Error);
                        }
                    }
                }
            }
        }
    }
}
