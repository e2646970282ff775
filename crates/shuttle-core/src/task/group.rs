//! TaskGroup - one command's tasks plus its scheduling mode.

use std::collections::HashSet;

use super::Executable;
use crate::domain::{GroupId, InternalFault, TaskStatus};

/// Ordered set of tasks for one command.
///
/// Tasks are kept sorted by position; positions are unique.
pub struct TaskGroup<T> {
    id: GroupId,
    tasks: Vec<T>,
    sequential: bool,
}

impl<T: Executable> TaskGroup<T> {
    pub fn new(id: GroupId, tasks: Vec<T>, sequential: bool) -> Result<Self, InternalFault> {
        let mut seen = HashSet::with_capacity(tasks.len());
        for task in &tasks {
            let position = task.lifecycle().position();
            if !seen.insert(position) {
                return Err(InternalFault::DuplicatePosition(position));
            }
        }
        let mut tasks = tasks;
        tasks.sort_by_key(|t| t.lifecycle().position());
        Ok(Self {
            id,
            tasks,
            sequential,
        })
    }

    /// Tasks run concurrently; no task affects another.
    pub fn parallel(id: GroupId, tasks: Vec<T>) -> Result<Self, InternalFault> {
        Self::new(id, tasks, false)
    }

    /// Tasks run one at a time in position order, failing fast.
    pub fn sequential(id: GroupId, tasks: Vec<T>) -> Result<Self, InternalFault> {
        Self::new(id, tasks, true)
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn is_sequential(&self) -> bool {
        self.sequential
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[T] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut [T] {
        &mut self.tasks
    }

    pub fn into_tasks(self) -> Vec<T> {
        self.tasks
    }

    /// Whether the task at `position` must be skipped: the group is
    /// sequential and a task at a smaller position is in `Error`.
    ///
    /// Tasks at later positions never affect earlier ones, even when they
    /// failed validation before scheduling started.
    pub fn should_fail_fast_before(&self, position: usize) -> bool {
        self.sequential
            && self
                .tasks
                .iter()
                .take_while(|t| t.lifecycle().position() < position)
                .any(|t| t.lifecycle().status() == TaskStatus::Error)
    }

    pub fn assert_all_terminal(&self) -> Result<(), InternalFault> {
        match self.tasks.iter().find(|t| !t.lifecycle().status().is_terminal()) {
            Some(task) => Err(InternalFault::NonTerminalTask {
                position: task.lifecycle().position(),
                status: task.lifecycle().status(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Statement, TaskFailure, TaskId};
    use crate::task::{ReadPage, Task};

    fn task(position: usize) -> Task<ReadPage> {
        Task::once(TaskId::generate(), position, ReadPage::new(Statement::new("SELECT")))
            .prepared()
            .unwrap()
    }

    #[test]
    fn sorts_tasks_by_position() {
        let group = TaskGroup::parallel(GroupId::generate(), vec![task(2), task(0), task(1)]).unwrap();
        let positions: Vec<_> = group.tasks().iter().map(|t| t.lifecycle().position()).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn rejects_duplicate_positions() {
        let result = TaskGroup::parallel(GroupId::generate(), vec![task(1), task(1)]);
        assert!(matches!(result, Err(InternalFault::DuplicatePosition(1))));
    }

    fn failed(position: usize) -> Task<ReadPage> {
        let mut task = task(position);
        let lifecycle = task.lifecycle_mut();
        lifecycle.transition(TaskStatus::InProgress).unwrap();
        lifecycle.fail(TaskFailure::invalid_input("bad")).unwrap();
        task
    }

    #[test]
    fn fail_fast_only_for_sequential_groups() {
        let parallel = TaskGroup::parallel(GroupId::generate(), vec![failed(0), task(1)]).unwrap();
        assert!(!parallel.should_fail_fast_before(1));

        let sequential =
            TaskGroup::sequential(GroupId::generate(), vec![failed(0), task(1)]).unwrap();
        assert!(sequential.should_fail_fast_before(1));
    }

    #[test]
    fn fail_fast_only_looks_at_earlier_positions() {
        let group = TaskGroup::sequential(
            GroupId::generate(),
            vec![task(0), failed(2), task(1), task(3)],
        )
        .unwrap();
        assert!(!group.should_fail_fast_before(0));
        assert!(!group.should_fail_fast_before(1));
        assert!(!group.should_fail_fast_before(2));
        assert!(group.should_fail_fast_before(3));
    }

    #[test]
    fn reports_first_non_terminal_task() {
        let group = TaskGroup::parallel(GroupId::generate(), vec![task(0), task(1)]).unwrap();
        assert_eq!(
            group.assert_all_terminal(),
            Err(InternalFault::NonTerminalTask {
                position: 0,
                status: TaskStatus::Ready
            })
        );
    }
}
