//! StatementExecutor port - "send statement, get rows".

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ResultSet, Statement};

/// Raw failures as reported by the driver, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RawFailure {
    #[error("read timeout: {0}")]
    ReadTimeout(String),

    #[error("write timeout: {0}")]
    WriteTimeout(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("coordinator overloaded: {0}")]
    Overloaded(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("{0}")]
    Other(String),
}

/// Runs one opaque unit of work.
///
/// Implementations must not retry on their own; retry decisions belong to the
/// task's retry policy.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn execute(&self, statement: &Statement) -> Result<ResultSet, RawFailure>;
}
