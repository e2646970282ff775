//! Non-fatal warnings attached to tasks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    /// Warning text returned by the database with a result set.
    Database,
    /// A read was retried with ALLOW FILTERING appended.
    AllowFilteringApplied,
    /// Documents were excluded from reranking because they had no passage.
    MissingRerankPassage,
}

/// A warning never stops execution and is never escalated to an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
}

impl Warning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
