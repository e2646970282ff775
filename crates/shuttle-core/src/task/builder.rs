//! TaskBuilder - ids and positions for one command's tasks.

use std::sync::Arc;

use super::{Command, Executable, Task, TaskGroup};
use crate::domain::{InternalFault, TaskId};
use crate::ports::{IdGenerator, SystemClock, UlidGenerator};
use crate::retry::RetryPolicy;

/// Hands out task ids and consecutive positions, starting at 0.
///
/// One builder per command: positions are indexes into that command's input.
pub struct TaskBuilder {
    ids: Arc<dyn IdGenerator>,
    next_position: usize,
}

impl TaskBuilder {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            ids,
            next_position: 0,
        }
    }

    /// Next id and position, for task types built outside this builder.
    pub fn next_slot(&mut self) -> (TaskId, usize) {
        let position = self.next_position;
        self.next_position += 1;
        (self.ids.generate_task_id(), position)
    }

    /// Builds and prepares the task for the next input item.
    pub fn task<C: Command>(
        &mut self,
        command: C,
        retry_policy: Arc<dyn RetryPolicy>,
    ) -> Result<Task<C>, InternalFault> {
        let (id, position) = self.next_slot();
        Task::new(id, position, command, retry_policy).prepared()
    }

    pub fn group<T: Executable>(
        &self,
        tasks: Vec<T>,
        sequential: bool,
    ) -> Result<TaskGroup<T>, InternalFault> {
        TaskGroup::new(self.ids.generate_group_id(), tasks, sequential)
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new(Arc::new(UlidGenerator::new(SystemClock)))
    }
}
