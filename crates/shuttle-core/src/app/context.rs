//! ExecutionContext - 実行時に共有するコラボレーター

use std::sync::Arc;

use crate::ports::{DefaultExceptionClassifier, ExceptionClassifier, StatementExecutor};

/// Read-only collaborators shared by every task of one request.
///
/// Tasks never store anything here; per-execution state stays on the task.
#[derive(Clone)]
pub struct ExecutionContext {
    executor: Arc<dyn StatementExecutor>,
    classifier: Arc<dyn ExceptionClassifier>,
}

impl ExecutionContext {
    /// Context with the default exception classifier.
    pub fn new(executor: Arc<dyn StatementExecutor>) -> Self {
        Self {
            executor,
            classifier: Arc::new(DefaultExceptionClassifier),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ExceptionClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn executor(&self) -> &dyn StatementExecutor {
        self.executor.as_ref()
    }

    pub fn classifier(&self) -> &dyn ExceptionClassifier {
        self.classifier.as_ref()
    }
}
