//! Errors - 失敗の分類
//!
//! Two families, deliberately kept apart:
//! - [`TaskFailure`]: recoverable, stored on a task and rendered in the response.
//! - [`InternalFault`]: programming-error class, aborts the whole request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::status::TaskStatus;

/// Domain failure classes, produced by the exception classifier or by a
/// command rejecting its own input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Database did not answer in time.
    Timeout,
    /// Narrow transient execution failure (coordinator could not reach replicas).
    Unavailable,
    /// Query rejected because it needs the opt-in scan flag (ALLOW FILTERING).
    MissingScanFlag,
    /// Malformed query; sending it again fails the same way.
    InvalidQuery,
    /// Bad user input detected before anything was sent.
    InvalidInput,
    /// Data does not match the table schema.
    SchemaMismatch,
    /// Conditional write not applied (e.g. duplicate `_id`).
    DocumentConflict,
    /// Reranking provider refused or failed the request.
    RerankingFailed,
    /// Anything the classifier could not place.
    Unexpected,
}

impl FailureKind {
    /// Stable error code rendered in responses.
    pub fn code(self) -> &'static str {
        match self {
            FailureKind::Timeout => "DATABASE_TIMEOUT",
            FailureKind::Unavailable => "DATABASE_UNAVAILABLE",
            FailureKind::MissingScanFlag => "MISSING_ALLOW_FILTERING",
            FailureKind::InvalidQuery => "INVALID_QUERY",
            FailureKind::InvalidInput => "INVALID_INPUT",
            FailureKind::SchemaMismatch => "SCHEMA_MISMATCH",
            FailureKind::DocumentConflict => "DOCUMENT_ALREADY_EXISTS",
            FailureKind::RerankingFailed => "RERANKING_PROVIDER_FAILED",
            FailureKind::Unexpected => "UNEXPECTED_SERVER_ERROR",
        }
    }
}

/// A recoverable failure stored on a task.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidInput, message)
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Fatal internal-consistency faults.
///
/// These are never stored on a task; they escape `Operation::execute` and
/// abort the request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InternalFault {
    #[error("illegal task transition for position {position}: {from:?} -> {to:?}")]
    IllegalTransition {
        position: usize,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("task at position {position} is {status:?} after scheduling completed")]
    NonTerminalTask { position: usize, status: TaskStatus },

    #[error("duplicate task position {0} in group")]
    DuplicatePosition(usize),

    #[error("completed task at position {position} has no payload")]
    MissingPayload { position: usize },

    #[error("page {page} cannot render a {payload} payload (position {position})")]
    PayloadMismatch {
        page: &'static str,
        payload: &'static str,
        position: usize,
    },

    #[error("cannot merge two existing {source_name} values")]
    AmbiguousMerge { source_name: &'static str },

    #[error("cannot merge or compare values of different sources: {left} vs {right}")]
    SourceMismatch {
        left: &'static str,
        right: &'static str,
    },

    #[error("{stream} stream document at rank {rank} has no _id")]
    MissingDocumentId { stream: &'static str, rank: u32 },

    #[error("rank must be > 0, got {0}")]
    InvalidRank(u32),

    #[error("reranker returned {ranks} ranks for {passages} passages")]
    RankCountMismatch { passages: usize, ranks: usize },

    #[error("reranker returned index {index} for {passages} passages")]
    RankIndexOutOfRange { index: usize, passages: usize },

    #[error("reranker returned index {0} more than once")]
    DuplicateRankIndex(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_serializes_as_screaming_snake_case() {
        let s = serde_json::to_string(&FailureKind::MissingScanFlag).unwrap();
        assert_eq!(s, "\"MISSING_SCAN_FLAG\"");
    }

    #[test]
    fn failure_display_includes_kind_and_message() {
        let f = TaskFailure::new(FailureKind::Timeout, "read timed out");
        assert_eq!(f.to_string(), "Timeout: read timed out");
        assert_eq!(f.code(), "DATABASE_TIMEOUT");
    }

    #[test]
    fn fault_messages_name_the_position() {
        let fault = InternalFault::NonTerminalTask {
            position: 3,
            status: TaskStatus::InProgress,
        };
        assert!(fault.to_string().contains("position 3"));
    }
}
