//! Task - 実行単位
//!
//! A task is one unit of work inside a request: it owns its lifecycle, its
//! retry policy and, once completed, its payload. Tasks are scheduled by
//! [`crate::app::Operation`] through the [`Executable`] trait.

mod builder;
mod command;
mod commands;
mod db_task;
mod group;
mod lifecycle;
mod merger;
mod rerank;

pub use self::builder::TaskBuilder;
pub use self::command::Command;
pub use self::commands::{DeleteDocuments, InsertDocument, ReadPage, SchemaChange, UpdateDocument};
pub use self::db_task::Task;
pub use self::group::TaskGroup;
pub use self::lifecycle::TaskLifecycle;
pub use self::merger::{MergedCandidates, PassageExtractor, RankedStream, ScoredDocumentMerger, StreamSource};
pub use self::rerank::RerankingTask;

use async_trait::async_trait;

use crate::app::ExecutionContext;
use crate::domain::{DocumentId, InternalFault, TaskPayload};

/// What the scheduler needs from a task.
#[async_trait]
pub trait Executable: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn lifecycle(&self) -> &TaskLifecycle;

    fn lifecycle_mut(&mut self) -> &mut TaskLifecycle;

    /// Present once the task is `Completed`.
    fn payload(&self) -> Option<&TaskPayload>;

    /// Id of the document the task targets, when it has one.
    fn document_id(&self) -> Option<DocumentId> {
        None
    }

    /// Runs the task to a terminal state.
    ///
    /// Recoverable failures end up stored on the lifecycle; only internal
    /// faults are returned.
    async fn execute(&mut self, ctx: &ExecutionContext) -> Result<(), InternalFault>;
}
