//! TaskAccumulator - finished tasks in, one ordered page out.

use std::collections::HashSet;

use tracing::debug;

use super::page::{Page, PageKind, ResponseError};
use crate::domain::{InternalFault, TaskStatus};
use crate::task::{Executable, TaskGroup};

pub struct TaskAccumulator<T> {
    kind: PageKind,
    tasks: Vec<T>,
    positions: HashSet<usize>,
}

impl<T: Executable> TaskAccumulator<T> {
    pub fn new(kind: PageKind) -> Self {
        Self {
            kind,
            tasks: Vec::new(),
            positions: HashSet::new(),
        }
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    /// Accepts one terminal task.
    pub fn add(&mut self, task: T) -> Result<(), InternalFault> {
        let lifecycle = task.lifecycle();
        if !lifecycle.status().is_terminal() {
            return Err(InternalFault::NonTerminalTask {
                position: lifecycle.position(),
                status: lifecycle.status(),
            });
        }
        if !self.positions.insert(lifecycle.position()) {
            return Err(InternalFault::DuplicatePosition(lifecycle.position()));
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn accumulate(&mut self, group: TaskGroup<T>) -> Result<(), InternalFault> {
        for task in group.into_tasks() {
            self.add(task)?;
        }
        Ok(())
    }

    /// Renders the page. Output depends only on positions and statuses,
    /// never on the order tasks were added in.
    pub fn into_page(mut self) -> Result<Page, InternalFault> {
        self.tasks.sort_by_key(|t| t.lifecycle().position());

        let tag = self.kind.tags_errors();
        let mut page = Page::default();
        for task in &self.tasks {
            let lifecycle = task.lifecycle();
            // recovered failures stay in the attempt history only
            if lifecycle.status() == TaskStatus::Error
                && let Some(failure) = lifecycle.failure()
            {
                let position = tag.then_some(lifecycle.position());
                page.errors.push(ResponseError::new(position, failure));
            }
            page.warnings.extend(lifecycle.visible_warnings().cloned());
        }

        self.kind.render(&self.tasks, &mut page)?;
        debug!(
            page = self.kind.name(),
            tasks = self.tasks.len(),
            errors = page.errors.len(),
            warnings = page.warnings.len(),
            "page rendered"
        );
        Ok(page)
    }
}
