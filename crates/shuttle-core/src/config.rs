//! Execution settings shared by the task builders.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::{AllowFilteringRetryPolicy, NoRetryPolicy, RetryPolicy, SchemaChangeRetryPolicy};
use crate::task::PassageExtractor;

/// Retry budgets and rerank options.
///
/// Every field has a default, so a partial JSON object is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Delay before a read is resubmitted with ALLOW FILTERING.
    pub read_retry_delay_ms: u64,

    /// Attempts per schema change, first attempt included.
    pub schema_max_attempts: u32,

    pub schema_retry_delay_ms: u64,

    /// Dotted path of the passage reranking reads from each document.
    pub rerank_passage_field: String,

    /// Render `$scores` on reranked documents.
    pub include_scores: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            read_retry_delay_ms: 0,
            schema_max_attempts: 3,
            schema_retry_delay_ms: 25,
            rerank_passage_field: "$vectorize".to_string(),
            include_scores: false,
        }
    }
}

impl ExecutionConfig {
    pub fn no_retry(&self) -> Arc<dyn RetryPolicy> {
        Arc::new(NoRetryPolicy)
    }

    pub fn read_retry(&self) -> Arc<dyn RetryPolicy> {
        Arc::new(AllowFilteringRetryPolicy::new(Duration::from_millis(
            self.read_retry_delay_ms,
        )))
    }

    pub fn schema_retry(&self) -> Arc<dyn RetryPolicy> {
        Arc::new(SchemaChangeRetryPolicy::new(
            self.schema_max_attempts,
            Duration::from_millis(self.schema_retry_delay_ms),
        ))
    }

    pub fn passage_extractor(&self) -> PassageExtractor {
        PassageExtractor::new(&self.rerank_passage_field)
    }
}
